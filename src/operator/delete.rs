use std::sync::Arc;

use log::debug;

use super::{insert::count_schema, OpIterator};
use crate::{
    buffer_pool::BufferPool,
    storage::{
        schema::Schema,
        tuple::{Cell, Tuple},
    },
    transaction::Transaction,
    types::SmallResult,
};

/// Deletes every tuple read from the child from the table it lives in,
/// yields one tuple holding the number of deleted tuples.
pub struct Delete {
    tx: Transaction,
    buffer_pool: Arc<BufferPool>,
    child: Box<dyn OpIterator>,

    done: bool,
}

impl Delete {
    pub fn new(buffer_pool: &Arc<BufferPool>, tx: &Transaction, child: Box<dyn OpIterator>) -> Self {
        Self {
            tx: *tx,
            buffer_pool: Arc::clone(buffer_pool),
            child,
            done: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> SmallResult {
        self.done = false;
        self.child.open()
    }

    fn next(&mut self) -> SmallResult<Option<Tuple>> {
        if self.done {
            return Ok(None);
        }

        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.buffer_pool.delete_tuple(&self.tx, &tuple)?;
            count += 1;
        }
        self.done = true;

        debug!("{} deleted {} tuples", self.tx, count);
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
