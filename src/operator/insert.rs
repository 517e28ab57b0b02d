use std::sync::Arc;

use log::debug;

use super::OpIterator;
use crate::{
    buffer_pool::BufferPool,
    error::{ErrorKind, SmallError},
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    types::SmallResult,
};

/// The schema of the single tuple `Insert` and `Delete` produce.
pub(super) fn count_schema() -> Schema {
    Schema::new(vec![Field::new("count", Type::Int64)])
}

/// Inserts every tuple read from the child into a table.
///
/// The operator yields exactly one tuple, holding the number of
/// inserted tuples.
pub struct Insert {
    tx: Transaction,
    buffer_pool: Arc<BufferPool>,
    table_id: u32,
    child: Box<dyn OpIterator>,

    done: bool,
}

impl Insert {
    pub fn new(
        buffer_pool: &Arc<BufferPool>,
        tx: &Transaction,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Self, SmallError> {
        let table = buffer_pool.get_table(table_id)?;
        let child_schema = child.get_schema();
        if !child_schema.same_types(table.get_schema()) {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!(
                    "can't insert tuples of {} into table {} of {}",
                    child_schema,
                    table.get_name(),
                    table.get_schema()
                ),
            ));
        }

        Ok(Self {
            tx: *tx,
            buffer_pool: Arc::clone(buffer_pool),
            table_id,
            child,
            done: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> SmallResult {
        self.done = false;
        self.child.open()
    }

    fn next(&mut self) -> SmallResult<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while let Some(mut tuple) = self.child.next()? {
            self.buffer_pool
                .insert_tuple(&self.tx, self.table_id, &mut tuple)?;
            count += 1;
        }
        self.done = true;

        debug!("{} inserted {} tuples into table {}", self.tx, count, self.table_id);
        Ok(Some(Tuple::new(&[Cell::new_int64(count)])))
    }

    fn rewind(&mut self) -> SmallResult {
        self.done = false;
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn get_schema(&self) -> Schema {
        count_schema()
    }
}
