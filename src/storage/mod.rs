mod heap_page;
mod heap_table;
mod page_id;
mod table_iter;

pub mod schema;
pub mod tuple;

pub use heap_page::*;
pub use heap_table::*;
pub use page_id::*;
pub use table_iter::*;
