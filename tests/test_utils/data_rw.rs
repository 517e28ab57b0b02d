use std::sync::Arc;

use log::debug;
use small_heap_db::{
    storage::{
        tuple::{Cell, Tuple},
        HeapTable,
    },
    transaction::Transaction,
    BufferPool,
};

pub fn new_int_tuple(value: i64, width: usize) -> Tuple {
    Tuple::new_int_tuples(value, width)
}

/// A tuple of `wide_schema`, `id` goes to the first column.
pub fn new_wide_tuple(id: i64) -> Tuple {
    let mut cells = vec![Cell::new_int64(id)];
    for i in 0..8 {
        cells.push(Cell::new_bytes(format!("payload {} of {}", i, id).as_bytes()));
    }
    Tuple::new(&cells)
}

/// Insert int tuples in a single transaction and commit it, return the
/// stored tuples (with record ids).
pub fn insert_int_tuples(
    pool: &Arc<BufferPool>,
    table: &HeapTable,
    values: &[i64],
    width: usize,
) -> Vec<Tuple> {
    let tx = Transaction::new();
    let mut stored = Vec::new();
    for v in values {
        let mut tuple = new_int_tuple(*v, width);
        pool.insert_tuple(&tx, table.get_id(), &mut tuple).unwrap();
        stored.push(tuple);
    }
    pool.commit(&tx).unwrap();
    debug!("{} tuples inserted into {}", values.len(), table);
    stored
}

/// Insert one tuple in its own transaction, start over when the
/// transaction is aborted by a lock timeout.
pub fn insert_with_retry(pool: &BufferPool, table_id: u32, tuple: &Tuple) {
    loop {
        let tx = Transaction::new();
        let mut t = tuple.clone();
        match pool.insert_tuple(&tx, table_id, &mut t) {
            Ok(()) => {
                pool.commit(&tx).unwrap();
                return;
            }
            Err(e) => {
                assert!(e.is_aborted(), "unexpected error: {}", e);
                pool.abort(&tx).unwrap();
            }
        }
    }
}

/// The first column of every tuple in the table, sorted. Runs in its
/// own transaction.
pub fn read_first_column(pool: &Arc<BufferPool>, table: &Arc<HeapTable>) -> Vec<i64> {
    let tx = Transaction::new();
    let mut values: Vec<i64> = table
        .iter(pool, &tx)
        .unwrap()
        .map(|t| t.unwrap().get_cell(0).get_int64().unwrap())
        .collect();
    pool.commit(&tx).unwrap();
    values.sort();
    values
}
