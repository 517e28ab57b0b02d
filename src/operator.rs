mod aggregate;
mod delete;
mod filter;
mod insert;
mod predicate;
mod seq_scan;

pub use aggregate::*;
pub use delete::*;
pub use filter::*;
pub use insert::*;
pub use predicate::*;
pub use seq_scan::*;

use crate::{
    storage::{schema::Schema, tuple::Tuple},
    types::SmallResult,
};

/// The pull-based interface shared by all operators.
///
/// An operator must be opened before `next` is called. `next` returns
/// `None` once the operator is exhausted, `rewind` restarts it from
/// the first tuple.
pub trait OpIterator {
    fn open(&mut self) -> SmallResult;

    fn next(&mut self) -> SmallResult<Option<Tuple>>;

    fn rewind(&mut self) -> SmallResult;

    fn close(&mut self);

    fn get_schema(&self) -> Schema;
}
