use std::fmt;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    Bool,
    Int64,
    Bytes(u8),
}

impl Type {
    /// Get the size of the type in bytes.
    pub fn size(&self) -> usize {
        match self {
            Type::Bool => 1,
            Type::Int64 => 8,
            Type::Bytes(size) => {
                // The first byte is the length of the payload, the
                // payload is padded to the declared size so every
                // slot of a page has the same width.
                1 + *size as usize
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::Int64 => write!(f, "int64"),
            Type::Bytes(size) => write!(f, "bytes({})", size),
        }
    }
}
