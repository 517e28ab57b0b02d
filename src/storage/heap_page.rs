use std::fmt;

use bit_vec::BitVec;
use log::debug;

use crate::{
    buffer_pool::BufferPool,
    error::{ErrorKind, SmallError},
    io::{SmallReader, SmallWriter},
    storage::{
        page_id::HeapPageID,
        schema::Schema,
        tuple::{RecordID, Tuple},
    },
    transaction::Transaction,
    types::SmallResult,
    utils::ceil_div,
};

/// The in-memory form of one page of a heap table.
///
/// # Format (on disk)
///
/// - header: a bitmap of `ceil(slot_count / 8)` bytes, bit `i` is set
///   when slot `i` holds a tuple
/// - slots: `slot_count` fixed-width tuples, empty slots are zeroed
/// - padding: zeros up to the page size
///
/// Besides the decoded content the page keeps a before-image, the
/// bytes last read from or flushed to disk. An aborted transaction
/// rolls the page back to it.
pub struct HeapPage {
    pid: HeapPageID,
    schema: Schema,

    slot_count: usize,

    // indicate slots' status: true means occupied, false means empty
    header: BitVec<u32>,

    // one entry per slot, `None` for empty slots
    tuples: Vec<Option<Tuple>>,

    // the transaction that dirtied this page, `None` for clean page
    dirty_tx: Option<Transaction>,

    before_image: Vec<u8>,
}

impl HeapPage {
    pub fn new(pid: &HeapPageID, bytes: &[u8], schema: &Schema) -> Result<Self, SmallError> {
        let page_size = BufferPool::get_page_size();
        if bytes.len() != page_size {
            return Err(SmallError::io(&format!(
                "page {} has {} bytes, expect {}",
                pid,
                bytes.len(),
                page_size
            )));
        }

        let slot_count = Self::calculate_slots_count(schema);
        let header_size = Self::calculate_header_size(slot_count);

        let mut reader = SmallReader::new(bytes);
        let header = BitVec::from_bytes(reader.read_exact(header_size)?);

        let mut tuples = Vec::with_capacity(slot_count);
        for slot in 0..slot_count {
            if header[slot] {
                let mut tuple = Tuple::read_from(&mut reader, schema)?;
                tuple.set_record_id(Some(RecordID::new(*pid, slot)));
                tuples.push(Some(tuple));
            } else {
                reader.read_exact(schema.get_size())?;
                tuples.push(None);
            }
        }

        Ok(Self {
            pid: *pid,
            schema: schema.clone(),
            slot_count,
            header,
            tuples,
            dirty_tx: None,
            before_image: bytes.to_vec(),
        })
    }

    /// Static method to generate a byte array corresponding to an
    /// empty page, used to add new pages to a file.
    pub fn empty_page_data() -> Vec<u8> {
        vec![0; BufferPool::get_page_size()]
    }

    /// Retrieve the maximum number of tuples this page can hold.
    ///
    /// Each tuple takes `size * 8` bits of payload plus one header bit.
    pub fn calculate_slots_count(schema: &Schema) -> usize {
        let bits_per_tuple_including_header = schema.get_size() * 8 + 1;
        BufferPool::get_page_size() * 8 / bits_per_tuple_including_header
    }

    pub fn calculate_header_size(slot_count: usize) -> usize {
        ceil_div(slot_count, 8)
    }
}

impl HeapPage {
    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_slots_count(&self) -> usize {
        self.slot_count
    }

    /// Returns true if associated slot on this page is filled.
    pub fn is_slot_used(&self, slot_index: usize) -> bool {
        slot_index < self.slot_count && self.header[slot_index]
    }

    pub fn empty_slots_count(&self) -> usize {
        (0..self.slot_count).filter(|i| !self.header[*i]).count()
    }

    /// Returns the number of tuples currently stored on this page
    pub fn tuples_count(&self) -> usize {
        self.slot_count - self.empty_slots_count()
    }

    pub fn get_tuple(&self, slot_index: usize) -> Option<Tuple> {
        self.tuples.get(slot_index).cloned().flatten()
    }

    /// Place the tuple in the first empty slot and return its new
    /// location.
    pub fn insert_tuple(&mut self, tuple: &Tuple) -> Result<RecordID, SmallError> {
        if !tuple.matches(&self.schema) {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!("tuple {} doesn't match schema {}", tuple, self.schema),
            ));
        }

        let slot = (0..self.slot_count)
            .find(|i| !self.header[*i])
            .ok_or_else(|| SmallError::new(&format!("page {} is full", self.pid)))?;

        let rid = RecordID::new(self.pid, slot);
        let mut stored = tuple.clone();
        stored.set_record_id(Some(rid));
        self.tuples[slot] = Some(stored);
        self.header.set(slot, true);

        debug!("insert tuple {} into {}, slot: {}", tuple, self.pid, slot);
        Ok(rid)
    }

    /// Clear the slot referred to by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> SmallResult {
        let rid = tuple.get_record_id().ok_or_else(|| {
            SmallError::not_found(&format!("tuple {} has no record id", tuple))
        })?;

        if rid.pid != self.pid {
            return Err(SmallError::not_found(&format!(
                "tuple {:?} is not on page {}",
                tuple, self.pid
            )));
        }

        if !self.is_slot_used(rid.slot) {
            return Err(SmallError::not_found(&format!(
                "slot {} of page {} is already empty",
                rid.slot, self.pid
            )));
        }

        self.header.set(rid.slot, false);
        self.tuples[rid.slot] = None;
        Ok(())
    }

    /// Generate the on-disk bytes of this page.
    pub fn get_page_data(&self) -> Result<Vec<u8>, SmallError> {
        let page_size = BufferPool::get_page_size();
        let mut writer = SmallWriter::new_reserved(page_size);

        // `BitVec::to_bytes` pads the last byte, the header length is
        // always `ceil(slot_count / 8)` bytes.
        writer.write_bytes(&self.header.to_bytes());

        let empty_slot = vec![0; self.schema.get_size()];
        for tuple in &self.tuples {
            match tuple {
                Some(t) => t.encode_disk(&mut writer, &self.schema)?,
                None => writer.write_bytes(&empty_slot),
            }
        }

        writer.to_padded_bytes(page_size)
    }
}

// dirty tag and before-image
impl HeapPage {
    pub fn mark_dirty(&mut self, tx: Option<Transaction>) {
        self.dirty_tx = tx;
    }

    /// Return the transaction that dirtied this page, `None` if the
    /// page is clean.
    pub fn is_dirty(&self) -> Option<Transaction> {
        self.dirty_tx
    }

    pub fn get_before_image(&self) -> &[u8] {
        &self.before_image
    }

    /// Take a snapshot of the current content as the new before-image,
    /// called after the page is flushed.
    pub fn set_before_image(&mut self) -> SmallResult {
        self.before_image = self.get_page_data()?;
        Ok(())
    }

    /// Discard all in-memory changes, the page goes back to its
    /// before-image and becomes clean.
    pub fn rollback(&mut self) -> SmallResult {
        let restored = HeapPage::new(&self.pid, &self.before_image, &self.schema)?;
        *self = restored;
        Ok(())
    }
}

impl fmt::Debug for HeapPage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapPage {}, tuples: {}/{}, dirty: {:?}, header: {}>",
            self.pid,
            self.tuples_count(),
            self.slot_count,
            self.dirty_tx,
            hex::encode(self.header.to_bytes()),
        )
    }
}
