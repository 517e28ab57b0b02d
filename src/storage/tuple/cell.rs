use std::fmt;

use crate::{
    error::{ErrorKind, SmallError},
    io::{SmallReader, SmallWriter},
    storage::schema::Type,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cell {
    Bool(bool),
    Int64(i64),
    Bytes(Vec<u8>),
}

// constructors
impl Cell {
    pub fn new_int64(v: i64) -> Self {
        Cell::Int64(v)
    }

    pub fn new_bool(v: bool) -> Self {
        Cell::Bool(v)
    }

    pub fn new_bytes(v: &[u8]) -> Self {
        Cell::Bytes(v.to_vec())
    }
}

impl Cell {
    pub fn get_int64(&self) -> Result<i64, SmallError> {
        match self {
            Cell::Int64(v) => Ok(*v),
            _ => Err(SmallError::new(&format!("not an int64 cell: {:?}", self))),
        }
    }

    pub fn get_bool(&self) -> Result<bool, SmallError> {
        match self {
            Cell::Bool(v) => Ok(*v),
            _ => Err(SmallError::new(&format!("not a bool cell: {:?}", self))),
        }
    }

    pub fn get_bytes(&self) -> Result<Vec<u8>, SmallError> {
        match self {
            Cell::Bytes(v) => Ok(v.clone()),
            _ => Err(SmallError::new(&format!("not a bytes cell: {:?}", self))),
        }
    }

    pub fn get_type(&self) -> Type {
        match self {
            Cell::Bool(_) => Type::Bool,
            Cell::Int64(_) => Type::Int64,
            Cell::Bytes(v) => Type::Bytes(v.len() as u8),
        }
    }

    /// Whether this cell can be stored in a column of type `t`.
    pub fn fits(&self, t: &Type) -> bool {
        match (self, t) {
            (Cell::Bool(_), Type::Bool) => true,
            (Cell::Int64(_), Type::Int64) => true,
            (Cell::Bytes(v), Type::Bytes(size)) => v.len() <= *size as usize,
            _ => false,
        }
    }

    /// Encode the cell into exactly `t.size()` bytes.
    ///
    /// # Format
    /// - Bool: 1 byte
    /// - Int64: 8 bytes, big-endian
    /// - Bytes(n): 1 byte payload length, then the payload padded to n
    ///   bytes
    pub fn encode_disk(&self, writer: &mut SmallWriter, t: &Type) -> Result<(), SmallError> {
        if !self.fits(t) {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!("cell {:?} doesn't fit type {}", self, t),
            ));
        }

        match (self, t) {
            (Cell::Bool(v), _) => writer.write(v),
            (Cell::Int64(v), _) => writer.write(v),
            (Cell::Bytes(v), Type::Bytes(size)) => {
                writer.write(&(v.len() as u8));
                writer.write_bytes(v);
                writer.write_bytes(&vec![0; *size as usize - v.len()]);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn decode_disk(reader: &mut SmallReader, t: &Type) -> Result<Self, SmallError> {
        match t {
            Type::Bool => Ok(Cell::Bool(reader.read()?)),
            Type::Int64 => Ok(Cell::Int64(reader.read()?)),
            Type::Bytes(size) => {
                let len: u8 = reader.read()?;
                let payload = reader.read_exact(*size as usize)?;
                if len > *size {
                    return Err(SmallError::io(&format!(
                        "corrupted bytes cell, len {} > size {}",
                        len, size
                    )));
                }
                Ok(Cell::Bytes(payload[..len as usize].to_vec()))
            }
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int64(v) => write!(f, "{}", v),
            Cell::Bytes(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_padding() {
        let t = Type::Bytes(6);
        let mut writer = SmallWriter::new();
        Cell::new_bytes(b"abc").encode_disk(&mut writer, &t).unwrap();
        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), t.size());
        assert_eq!(bytes, vec![3, b'a', b'b', b'c', 0, 0, 0]);

        let mut reader = SmallReader::new(&bytes);
        assert_eq!(
            Cell::decode_disk(&mut reader, &t).unwrap(),
            Cell::new_bytes(b"abc")
        );
    }

    #[test]
    fn test_type_mismatch() {
        let mut writer = SmallWriter::new();
        let err = Cell::new_bool(true)
            .encode_disk(&mut writer, &Type::Int64)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);

        assert!(Cell::new_bytes(b"too long")
            .encode_disk(&mut writer, &Type::Bytes(3))
            .is_err());
    }
}
