use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, info};

use super::{HeapPage, HeapPageID, HeapTableIterator};
use crate::{
    buffer_pool::BufferPool,
    error::{ErrorKind, SmallError},
    io::SmallFile,
    storage::{schema::Schema, tuple::Tuple},
    transaction::{Permission, Transaction},
    types::{Pod, SmallResult},
    utils::{HandyMutex, HandyRwLock},
};

/// A table stored as an unordered collection of fixed-size pages in a
/// single file.
///
/// The table reads and writes raw page bytes, all decoded pages go
/// through the buffer pool.
pub struct HeapTable {
    name: String,
    path: PathBuf,

    table_id: u32,

    schema: Schema,

    // serializes file growth and page writes
    file: Mutex<SmallFile>,
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<HeapTable {}, file: {:?}, id: {}>",
            self.name, self.path, self.table_id
        )
    }
}

// init functions
impl HeapTable {
    /// Open the table file at the given path, the file is created if it
    /// doesn't exist.
    ///
    /// The table id is derived from the absolute path of the file, so
    /// the same file always maps to the same id.
    pub fn new<P: AsRef<Path>>(
        table_name: &str,
        table_path: P,
        schema: &Schema,
    ) -> Result<Self, SmallError> {
        let file = SmallFile::new(table_path.as_ref())?;
        let path = table_path.as_ref().canonicalize()?;

        let file_size = file.get_size()?;
        let page_size = BufferPool::get_page_size() as u64;
        if file_size % page_size != 0 {
            return Err(SmallError::io(&format!(
                "size of {:?} is {}, not a multiple of page size {}",
                path, file_size, page_size
            )));
        }

        let mut hasher = DefaultHasher::new();
        path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        info!(
            "open table {}, id: {}, pages: {}",
            table_name,
            table_id,
            file_size / page_size
        );

        Ok(Self {
            name: table_name.to_string(),
            path,
            table_id,
            schema: schema.clone(),
            file: Mutex::new(file),
        })
    }
}

// normal read-only functions
impl HeapTable {
    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn get_schema(&self) -> &Schema {
        &self.schema
    }

    pub fn get_file(&self) -> MutexGuard<'_, SmallFile> {
        self.file.ml()
    }

    /// The count of pages in this table file.
    pub fn pages_count(&self) -> Result<usize, SmallError> {
        let file_size = self.get_file().get_size()? as usize;
        Ok(file_size / BufferPool::get_page_size())
    }

    /// Calculate the number of tuples in the table. Require S_LOCK on
    /// all pages, the locks are released when the count is done.
    pub fn tuples_count(self: &Arc<Self>, pool: &Arc<BufferPool>) -> Result<usize, SmallError> {
        let tx = Transaction::new();
        let mut count = 0;
        for tuple in self.iter(pool, &tx)? {
            tuple?;
            count += 1;
        }
        pool.commit(&tx)?;
        Ok(count)
    }

    /// Create an opened iterator over all tuples of the table.
    pub fn iter(
        self: &Arc<Self>,
        pool: &Arc<BufferPool>,
        tx: &Transaction,
    ) -> Result<HeapTableIterator, SmallError> {
        let mut it = HeapTableIterator::new(pool, tx, self);
        it.open()?;
        Ok(it)
    }
}

// page io
impl HeapTable {
    /// Read the raw bytes of a page.
    pub fn read_page(&self, pid: &HeapPageID) -> Result<Vec<u8>, SmallError> {
        self.check_owner(pid)?;

        let page_size = BufferPool::get_page_size();
        let start_pos = pid.page_index as u64 * page_size as u64;
        self.get_file().read_at(start_pos, page_size)
    }

    /// Overwrite a page which is already in the file.
    pub fn write_page(&self, pid: &HeapPageID, data: &[u8]) -> SmallResult {
        self.check_owner(pid)?;

        let page_size = BufferPool::get_page_size();
        if data.len() != page_size {
            return Err(SmallError::io(&format!(
                "page data of {} has {} bytes, expect {}",
                pid,
                data.len(),
                page_size
            )));
        }

        let mut file = self.get_file();
        let pages_count = file.get_size()? as usize / page_size;
        if pid.page_index as usize >= pages_count {
            return Err(SmallError::not_found(&format!(
                "page {} is beyond the end of table {}, pages: {}",
                pid, self.name, pages_count
            )));
        }

        let start_pos = pid.page_index as u64 * page_size as u64;
        file.write_at(start_pos, data)?;
        debug!("page {} written to disk", pid);
        Ok(())
    }

    /// Append an empty page to the end of the file and return its id.
    ///
    /// The file lock is held while the new page index is decided, so
    /// concurrent callers always get distinct pages.
    pub fn allocate_page(&self) -> Result<HeapPageID, SmallError> {
        let page_size = BufferPool::get_page_size();

        let mut file = self.get_file();
        let page_index = file.get_size()? as usize / page_size;
        file.write_at((page_index * page_size) as u64, &HeapPage::empty_page_data())?;

        let pid = HeapPageID::new(self.table_id, page_index as u32);
        debug!("table {} grows, new page: {}", self.name, pid);
        Ok(pid)
    }

    pub fn clear(&self) -> SmallResult {
        self.get_file().set_len(0)
    }

    fn check_owner(&self, pid: &HeapPageID) -> SmallResult {
        if pid.get_table_id() != self.table_id {
            return Err(SmallError::not_found(&format!(
                "page {} doesn't belong to table {}",
                pid, self.name
            )));
        }
        Ok(())
    }
}

// insert / delete
impl HeapTable {
    /// Insert a tuple into the first page which has an empty slot, grow
    /// the file if no page has room.
    ///
    /// On success the record id of `tuple` is set, and the modified
    /// pages are returned. The caller (`BufferPool::insert_tuple`) is
    /// responsible for marking them dirty.
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tx: &Transaction,
        tuple: &mut Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        // no page can ever hold such a tuple, don't grow the file for it
        if HeapPage::calculate_slots_count(&self.schema) == 0 {
            return Err(SmallError::with_kind(
                ErrorKind::SchemaMismatch,
                &format!(
                    "tuple of {} bytes doesn't fit in a page of {} bytes, table: {}",
                    self.schema.get_size(),
                    BufferPool::get_page_size(),
                    self.name
                ),
            ));
        }

        for page_index in 0..self.pages_count()? {
            let pid = HeapPageID::new(self.table_id, page_index as u32);

            // Pages are locked in ascending order, so inserters never
            // wait for each other in a cycle. A full page which wasn't
            // locked by this transaction before is released right away,
            // it hasn't been modified.
            let held_before = pool.holds_lock(tx, &pid);
            let pod = pool.get_page(tx, Permission::ReadWrite, &pid)?;
            let rid = {
                let mut page = pod.wl();
                if page.empty_slots_count() == 0 {
                    None
                } else {
                    Some(page.insert_tuple(tuple)?)
                }
            };

            match rid {
                Some(rid) => {
                    tuple.set_record_id(Some(rid));
                    return Ok(vec![pod]);
                }
                None => {
                    if !held_before {
                        pool.release_lock(tx, &pid);
                    }
                }
            }
        }

        let pid = self.allocate_page()?;
        let pod = pool.get_page(tx, Permission::ReadWrite, &pid)?;
        let rid = pod.wl().insert_tuple(tuple)?;
        tuple.set_record_id(Some(rid));
        Ok(vec![pod])
    }

    /// Remove the tuple from the page its record id points to.
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<Vec<Pod<HeapPage>>, SmallError> {
        let rid = tuple.get_record_id().ok_or_else(|| {
            SmallError::not_found(&format!("tuple {} has no record id", tuple))
        })?;
        self.check_owner(&rid.pid)?;

        let pod = pool.get_page(tx, Permission::ReadWrite, &rid.pid)?;
        pod.wl().delete_tuple(tuple)?;
        Ok(vec![pod])
    }
}
