use std::sync::Arc;

use super::OpIterator;
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    storage::{schema::Schema, tuple::Tuple, HeapTableIterator},
    transaction::Transaction,
    types::SmallResult,
};

/// Reads every tuple of a table in no particular order.
pub struct SeqScan {
    schema: Schema,
    it: HeapTableIterator,
}

impl SeqScan {
    /// Field names of the output schema are prefixed with `alias`, e.g.
    /// `t.id`.
    pub fn new(
        buffer_pool: &Arc<BufferPool>,
        tx: &Transaction,
        table_id: u32,
        alias: &str,
    ) -> Result<Self, SmallError> {
        let table = buffer_pool.get_table(table_id)?;
        Ok(Self {
            schema: table.get_schema().with_prefix(alias),
            it: HeapTableIterator::new(buffer_pool, tx, &table),
        })
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> SmallResult {
        self.it.open()
    }

    fn next(&mut self) -> SmallResult<Option<Tuple>> {
        self.it.advance()
    }

    fn rewind(&mut self) -> SmallResult {
        self.it.rewind()
    }

    fn close(&mut self) {
        self.it.close();
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
