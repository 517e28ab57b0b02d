mod cell;
mod tuple;

pub use cell::*;
pub use tuple::*;
