mod test_utils;

use std::{fs::OpenOptions, io::Write, sync::Arc};

use small_heap_db::{
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
        HeapPage, HeapPageID, HeapTable,
    },
    transaction::{Permission, Transaction},
    utils::HandyRwLock,
    BufferPool, ErrorKind,
};
use test_utils::{
    insert_int_tuples, new_int_table, new_int_tuple, new_wide_table, new_wide_tuple,
    read_first_column, setup, wide_schema,
};

#[test]
fn test_one_tuple_per_page() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_wide_table(&ctx, "wide");
    assert_eq!(HeapPage::calculate_slots_count(&wide_schema()), 1);
    assert_eq!(table.pages_count().unwrap(), 0);

    let tx = Transaction::new();
    let mut first = new_wide_tuple(1);
    pool.insert_tuple(&tx, table.get_id(), &mut first).unwrap();
    assert_eq!(table.pages_count().unwrap(), 1);

    // the only page is full now, the table grows
    let mut second = new_wide_tuple(2);
    pool.insert_tuple(&tx, table.get_id(), &mut second).unwrap();
    assert_eq!(table.pages_count().unwrap(), 2);
    pool.commit(&tx).unwrap();

    assert_eq!(first.get_record_id().unwrap().pid.page_index, 0);
    assert_eq!(second.get_record_id().unwrap().pid.page_index, 1);
    assert_eq!(read_first_column(pool, &table), vec![1, 2]);
}

#[test]
fn test_fill_page_then_grow() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 2);
    let slots = HeapPage::calculate_slots_count(table.get_schema());
    assert_eq!(slots, 254);

    let values: Vec<i64> = (0..slots as i64 + 10).collect();
    let stored = insert_int_tuples(pool, &table, &values, 2);
    assert_eq!(table.pages_count().unwrap(), 2);

    // slots are filled in order
    for (i, tuple) in stored.iter().enumerate().take(slots) {
        let rid = tuple.get_record_id().unwrap();
        assert_eq!(rid.pid, HeapPageID::new(table.get_id(), 0));
        assert_eq!(rid.slot, i);
    }
    assert_eq!(stored[slots].get_record_id().unwrap().slot, 0);
    assert_eq!(table.tuples_count(pool).unwrap(), values.len());
}

#[test]
fn test_freed_slot_is_reused() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 2);
    let stored = insert_int_tuples(pool, &table, &[1, 2, 3], 2);

    let tx = Transaction::new();
    pool.delete_tuple(&tx, &stored[1]).unwrap();
    let mut tuple = new_int_tuple(4, 2);
    pool.insert_tuple(&tx, table.get_id(), &mut tuple).unwrap();
    pool.commit(&tx).unwrap();

    assert_eq!(tuple.get_record_id(), stored[1].get_record_id());
    assert_eq!(read_first_column(pool, &table), vec![1, 3, 4]);
}

#[test]
fn test_delete_errors() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 2);
    let other = new_int_table(&ctx, "other", 2);
    let stored = insert_int_tuples(pool, &table, &[1], 2);
    let others = insert_int_tuples(pool, &other, &[1], 2);

    let tx = Transaction::new();

    // never stored
    let err = pool.delete_tuple(&tx, &new_int_tuple(1, 2)).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // stored in another table
    let err = table.delete_tuple(pool, &tx, &others[0]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // deleted twice
    pool.delete_tuple(&tx, &stored[0]).unwrap();
    let err = pool.delete_tuple(&tx, &stored[0]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    pool.abort(&tx).unwrap();
}

#[test]
fn test_page_io() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 2);
    insert_int_tuples(pool, &table, &[1], 2);

    let pid = HeapPageID::new(table.get_id(), 0);
    let data = table.read_page(&pid).unwrap();
    assert_eq!(data.len(), BufferPool::get_page_size());

    // short read
    let beyond = HeapPageID::new(table.get_id(), 1);
    let err = table.read_page(&beyond).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);

    // writes never append
    let err = table.write_page(&beyond, &data).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(table.pages_count().unwrap(), 1);

    // wrong size
    let err = table.write_page(&pid, &data[1..]).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);

    let empty = HeapPage::empty_page_data();
    table.write_page(&pid, &empty).unwrap();
    assert_eq!(table.read_page(&pid).unwrap(), empty);
}

#[test]
fn test_allocate_page() {
    let ctx = setup(10);
    let table = new_int_table(&ctx, "t", 2);

    let p0 = table.allocate_page().unwrap();
    let p1 = table.allocate_page().unwrap();
    assert_eq!(p0.page_index, 0);
    assert_eq!(p1.page_index, 1);
    assert_eq!(table.pages_count().unwrap(), 2);
    assert_eq!(table.read_page(&p1).unwrap(), HeapPage::empty_page_data());
}

#[test]
fn test_table_id_is_stable() {
    let ctx = setup(10);
    let schema = Schema::small_int_schema(2, "");
    let path = ctx.db.get_path().join("stable.table");

    let a = HeapTable::new("stable", &path, &schema).unwrap();
    let b = HeapTable::new("stable", &path, &schema).unwrap();
    assert_eq!(a.get_id(), b.get_id());

    let c = HeapTable::new("another", ctx.db.get_path().join("another.table"), &schema).unwrap();
    assert_ne!(a.get_id(), c.get_id());
}

#[test]
fn test_reopen_keeps_content() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 3);
    insert_int_tuples(pool, &table, &[5, 6], 3);

    // a second handle on the same file, registered under the same id
    let reopened = ctx.db.create_table("t", table.get_schema()).unwrap();
    assert_eq!(reopened.get_id(), table.get_id());
    let found = ctx.db.catalog().get_table_by_name("t").unwrap();
    assert!(Arc::ptr_eq(&found, &reopened));
    assert!(ctx.db.catalog().get_table_by_name("missing").is_none());
    pool.clear();
    assert_eq!(read_first_column(pool, &reopened), vec![5, 6]);
}

#[test]
fn test_torn_file_is_rejected() {
    let ctx = setup(10);
    let path = ctx.db.get_path().join("torn.table");
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .open(&path)
        .unwrap();
    file.write_all(&[1, 2, 3]).unwrap();

    let err = HeapTable::new("torn", &path, &Schema::small_int_schema(1, ""))
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::Io);
}

#[test]
fn test_mismatched_tuple() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_int_table(&ctx, "t", 2);

    let tx = Transaction::new();
    let mut tuple = Tuple::new_int_tuples(1, 3);
    let err = pool
        .insert_tuple(&tx, table.get_id(), &mut tuple)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    pool.abort(&tx).unwrap();
}

/// The page appended by an aborted insert stays in the file, empty, and
/// is reused by the next insert.
#[test]
fn test_growth_then_abort() {
    let ctx = setup(10);
    let pool = ctx.pool();
    let table = new_wide_table(&ctx, "wide");
    let pid = HeapPageID::new(table.get_id(), 0);

    let tx = Transaction::new();
    let mut tuple = new_wide_tuple(1);
    pool.insert_tuple(&tx, table.get_id(), &mut tuple).unwrap();
    assert_eq!(table.pages_count().unwrap(), 1);
    pool.abort(&tx).unwrap();

    assert_eq!(table.pages_count().unwrap(), 1);
    let on_disk = HeapPage::new(&pid, &table.read_page(&pid).unwrap(), table.get_schema()).unwrap();
    assert_eq!(on_disk.tuples_count(), 0);

    let tx = Transaction::new();
    let cached = pool.get_page(&tx, Permission::ReadOnly, &pid).unwrap();
    assert_eq!(cached.rl().tuples_count(), 0);
    assert!(cached.rl().is_dirty().is_none());
    pool.commit(&tx).unwrap();

    let tx = Transaction::new();
    let mut tuple = new_wide_tuple(2);
    pool.insert_tuple(&tx, table.get_id(), &mut tuple).unwrap();
    pool.commit(&tx).unwrap();
    assert_eq!(tuple.get_record_id().unwrap().pid, pid);
    assert_eq!(table.pages_count().unwrap(), 1);
    assert_eq!(read_first_column(pool, &table), vec![2]);
}

#[test]
fn test_tuple_wider_than_page() {
    let ctx = setup(10);
    let pool = ctx.pool();

    // 17 * 256 bytes, more than a 4096 bytes page
    let fields = (0..17)
        .map(|i| Field::new(&format!("blob-{}", i), Type::Bytes(255)))
        .collect();
    let schema = Schema::new(fields);
    assert_eq!(HeapPage::calculate_slots_count(&schema), 0);
    let table = ctx.db.create_table("huge", &schema).unwrap();

    let cells: Vec<Cell> = (0..17).map(|_| Cell::new_bytes(&[1; 255])).collect();
    let mut tuple = Tuple::new(&cells);
    let tx = Transaction::new();
    for _ in 0..2 {
        let err = pool.insert_tuple(&tx, table.get_id(), &mut tuple).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }
    pool.abort(&tx).unwrap();

    assert_eq!(table.pages_count().unwrap(), 0);
    assert!(tuple.get_record_id().is_none());
}
