pub mod buffer_pool;
pub mod catalog;
pub mod database;
pub mod error;
pub mod io;
pub mod operator;
pub mod storage;
pub mod transaction;
pub mod types;
pub mod utils;

mod log;

pub use buffer_pool::{BufferPool, LockTimeout, DEFAULT_PAGES, DEFAULT_PAGE_SIZE};
pub use catalog::{Catalog, TableCatalog};
pub use database::Database;
pub use error::{ErrorKind, SmallError};
pub use storage::{HeapPage, HeapPageID, HeapTable, HeapTableIterator};
pub use transaction::{Permission, Transaction};
