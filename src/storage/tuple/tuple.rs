use std::fmt;

use itertools::Itertools;

use super::Cell;
use crate::{
    error::{ErrorKind, SmallError},
    io::{SmallReader, SmallWriter},
    storage::{page_id::HeapPageID, schema::Schema},
};

/// The location of a tuple: the page it lives on and the slot inside
/// that page.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct RecordID {
    pub pid: HeapPageID,
    pub slot: usize,
}

impl RecordID {
    pub fn new(pid: HeapPageID, slot: usize) -> Self {
        Self { pid, slot }
    }
}

#[derive(Clone)]
pub struct Tuple {
    cells: Vec<Cell>,

    /// Set when the tuple is placed on (or read from) a page, `None`
    /// for tuples which are not stored anywhere yet.
    record_id: Option<RecordID>,
}

// constructors
impl Tuple {
    pub fn new(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
            record_id: None,
        }
    }

    /// A tuple of `width` int64 cells, all set to `value`.
    pub fn new_int_tuples(value: i64, width: usize) -> Self {
        Self::new(&vec![Cell::Int64(value); width])
    }

    pub fn read_from(reader: &mut SmallReader, schema: &Schema) -> Result<Self, SmallError> {
        let mut cells = Vec::with_capacity(schema.fields_count());
        for field in schema.get_fields() {
            cells.push(Cell::decode_disk(reader, &field.get_type())?);
        }
        Ok(Self::new(&cells))
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn get_cells(&self) -> &Vec<Cell> {
        &self.cells
    }

    pub fn get_record_id(&self) -> Option<RecordID> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordID>) {
        self.record_id = record_id;
    }

    /// Whether every cell of this tuple can be stored under `schema`.
    pub fn matches(&self, schema: &Schema) -> bool {
        self.cells.len() == schema.fields_count()
            && self
                .cells
                .iter()
                .zip(schema.get_fields())
                .all(|(c, f)| c.fits(&f.get_type()))
    }

    /// Write the fixed-width disk format of this tuple, the output is
    /// exactly `schema.get_size()` bytes.
    pub fn encode_disk(&self, writer: &mut SmallWriter, schema: &Schema) -> Result<(), SmallError> {
        if self.cells.len() != schema.fields_count() {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!("tuple {} doesn't match schema {}", self, schema),
            ));
        }

        for (cell, field) in self.cells.iter().zip(schema.get_fields()) {
            cell.encode_disk(writer, &field.get_type())?;
        }
        Ok(())
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{{}}}", self.cells.iter().join(", "))
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.record_id {
            Some(rid) => write!(f, "{}@{}#{}", self, rid.pid, rid.slot),
            None => write!(f, "{}", self),
        }
    }
}
