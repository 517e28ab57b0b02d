use std::{
    convert::TryInto,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::Path,
};

use crate::{error::SmallError, types::SmallResult};

/// A thin wrapper over `File` which speaks in offsets and exact-size
/// buffers, and turns io failures into `SmallError`.
pub struct SmallFile {
    file: File,
}

impl SmallFile {
    /// Create a new `SmallFile` from the given file path and open it
    /// with read and write mode.
    ///
    /// If the file doesn't exist, it will be created.
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, SmallError> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)?;

        Ok(Self { file })
    }

    pub fn get_size(&self) -> Result<u64, SmallError> {
        let metadata = self.file.metadata()?;
        Ok(metadata.len())
    }

    /// Read exactly `len` bytes start from `offset`. Fails if the file
    /// is shorter than `offset + len`.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, SmallError> {
        self.file.seek(SeekFrom::Start(offset))?;

        let mut buf = vec![0u8; len];
        self.file.read_exact(&mut buf).map_err(|e| {
            SmallError::io(&format!(
                "short read, offset: {}, len: {}, error: {}",
                offset, len, e
            ))
        })?;
        Ok(buf)
    }

    pub fn write_at(&mut self, offset: u64, buf: &[u8]) -> SmallResult {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn set_len(&self, len: u64) -> SmallResult {
        self.file.set_len(len)?;
        Ok(())
    }
}

pub struct SmallWriter {
    buf: Vec<u8>,
}

impl SmallWriter {
    /// Create a new `SmallWriter` with an empty buffer.
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create a new `SmallWriter` with a buffer of the given capacity.
    pub fn new_reserved(cap: usize) -> Self {
        Self {
            buf: Vec::with_capacity(cap),
        }
    }

    pub fn write<T: Encodeable + ?Sized>(&mut self, obj: &T) {
        obj.encode(self);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Pad the buffer with zeros to the given size.
    pub fn to_padded_bytes(mut self, size: usize) -> Result<Vec<u8>, SmallError> {
        if self.buf.len() > size {
            return Err(SmallError::new(&format!(
                "buffer size is larger than the given size: {} > {}",
                self.buf.len(),
                size
            )));
        }

        self.buf.resize(size, 0);
        Ok(self.buf)
    }
}

impl Default for SmallWriter {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SmallReader<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> SmallReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }

    pub fn read_exact(&mut self, bytes_count: usize) -> Result<&'a [u8], SmallError> {
        let start = self.cursor;
        let end = self.cursor + bytes_count;

        // boundary check
        if end > self.buf.len() {
            return Err(SmallError::io(&format!(
                "read out of boundary, want [{}, {}), len: {}",
                start,
                end,
                self.buf.len()
            )));
        }

        self.cursor = end;
        Ok(&self.buf[start..end])
    }

    pub fn read<T: Decodeable>(&mut self) -> Result<T, SmallError> {
        T::decode_from(self)
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

pub trait Encodeable {
    fn encode(&self, writer: &mut SmallWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = SmallWriter::new();
        self.encode(&mut writer);
        writer.to_bytes()
    }
}

pub trait Decodeable: Sized {
    fn decode_from(reader: &mut SmallReader) -> Result<Self, SmallError>;
}

/// # Format
///
/// - 1 byte (0 for false, 1 for true)
impl Encodeable for bool {
    fn encode(&self, writer: &mut SmallWriter) {
        writer.write_bytes(&[*self as u8]);
    }
}

impl Decodeable for bool {
    fn decode_from(reader: &mut SmallReader) -> Result<Self, SmallError> {
        Ok(reader.read_exact(1)?[0] != 0)
    }
}

// Integers are stored in big-endian, so the on-disk bytes of a page
// sort the same way as the values.
macro_rules! impl_serialization {
    (for $($t:ty),+) => {
        $(
            impl Encodeable for $t {
                fn encode(&self, writer: &mut SmallWriter) {
                    writer.write_bytes(&self.to_be_bytes());
                }
            }

            impl Decodeable for $t {
                fn decode_from(reader: &mut SmallReader) -> Result<Self, SmallError> {
                    let bytes = reader.read_exact(size_of::<Self>())?;
                    Ok(Self::from_be_bytes(bytes.try_into().unwrap()))
                }
            }
        )*
    }
}

impl_serialization!(for u8, u16, u32, u64, i32, i64);
