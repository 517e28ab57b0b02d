use super::{OpIterator, Predicate};
use crate::{
    storage::{schema::Schema, tuple::Tuple},
    types::SmallResult,
};

pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self { predicate, child }
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> SmallResult {
        self.child.open()
    }

    fn next(&mut self) -> SmallResult<Option<Tuple>> {
        while let Some(tuple) = self.child.next()? {
            if self.predicate.matches(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> SmallResult {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn get_schema(&self) -> Schema {
        self.child.get_schema()
    }
}
