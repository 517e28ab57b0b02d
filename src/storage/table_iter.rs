use std::sync::Arc;

use super::{HeapPage, HeapPageID, HeapTable};
use crate::{
    buffer_pool::BufferPool,
    error::SmallError,
    storage::tuple::Tuple,
    transaction::{Permission, Transaction},
    types::{Pod, SmallResult},
    utils::HandyRwLock,
};

/// Walks all tuples of a heap table, page by page, taking a shared lock
/// on every page it visits.
///
/// The iterator is lazy: a page is fetched only when the previous one
/// is exhausted. The number of pages is captured on `open`, pages
/// appended later are not visited until `rewind`.
pub struct HeapTableIterator {
    tx: Transaction,

    table: Arc<HeapTable>,
    buffer_pool: Arc<BufferPool>,

    // `None` when the iterator is closed
    cursor: Option<Cursor>,
}

struct Cursor {
    pages_count: usize,
    page_index: usize,

    // `None` only for a table without pages
    page: Option<Pod<HeapPage>>,
    slot: usize,
}

impl HeapTableIterator {
    /// Create a closed iterator, call `open` before reading.
    pub fn new(buffer_pool: &Arc<BufferPool>, tx: &Transaction, table: &Arc<HeapTable>) -> Self {
        Self {
            tx: *tx,
            table: Arc::clone(table),
            buffer_pool: Arc::clone(buffer_pool),
            cursor: None,
        }
    }

    pub fn open(&mut self) -> SmallResult {
        let pages_count = self.table.pages_count()?;
        let page = if pages_count > 0 {
            Some(self.fetch(0)?)
        } else {
            None
        };

        self.cursor = Some(Cursor {
            pages_count,
            page_index: 0,
            page,
            slot: 0,
        });
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.cursor.is_some()
    }

    /// Return the next tuple, `None` when all pages are exhausted or the
    /// iterator is closed.
    pub fn advance(&mut self) -> Result<Option<Tuple>, SmallError> {
        loop {
            let cursor = match &mut self.cursor {
                Some(cursor) => cursor,
                None => return Ok(None),
            };

            if let Some(pod) = &cursor.page {
                let page = pod.rl();
                while cursor.slot < page.get_slots_count() {
                    let slot = cursor.slot;
                    cursor.slot += 1;
                    if let Some(tuple) = page.get_tuple(slot) {
                        return Ok(Some(tuple));
                    }
                }
            }

            // current page is exhausted
            let next_index = cursor.page_index + 1;
            if cursor.page.is_none() || next_index >= cursor.pages_count {
                return Ok(None);
            }

            let pid = HeapPageID::new(self.table.get_id(), next_index as u32);
            let pod = self
                .buffer_pool
                .get_page(&self.tx, Permission::ReadOnly, &pid)?;
            cursor.page_index = next_index;
            cursor.page = Some(pod);
            cursor.slot = 0;
        }
    }

    /// Restart from the first tuple, the first page is fetched again.
    pub fn rewind(&mut self) -> SmallResult {
        self.close();
        self.open()
    }

    pub fn close(&mut self) {
        self.cursor = None;
    }

    fn fetch(&self, page_index: usize) -> Result<Pod<HeapPage>, SmallError> {
        let pid = HeapPageID::new(self.table.get_id(), page_index as u32);
        self.buffer_pool
            .get_page(&self.tx, Permission::ReadOnly, &pid)
    }
}

impl Iterator for HeapTableIterator {
    type Item = Result<Tuple, SmallError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}
