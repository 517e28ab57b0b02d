mod lock_manager;
mod tx;

pub use lock_manager::*;
pub use tx::*;
