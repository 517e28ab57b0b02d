use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, RwLock,
    },
    thread::sleep,
    time::{Duration, Instant},
};

use log::{debug, error, log_enabled, warn, Level};
use rand::Rng;

use crate::{
    catalog::TableCatalog,
    error::{ErrorKind, SmallError},
    storage::{tuple::Tuple, HeapPage, HeapPageID, HeapTable},
    transaction::{Lock, LockManager, Permission, Transaction},
    types::{Pod, ResultPod, SmallResult},
    utils::{HandyMutex, HandyRwLock},
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Default number of pages passed to the constructor, used by other
/// classes.
pub const DEFAULT_PAGES: usize = 50;

/// How long `get_page` keeps trying to acquire a lock.
///
/// Both the window and the sleep between attempts are randomized, so
/// transactions which wait for each other don't time out in lockstep.
#[derive(Clone, Copy, Debug)]
pub struct LockTimeout {
    pub base: Duration,
    pub jitter: Duration,

    pub retry_interval: Duration,
    pub retry_jitter: Duration,
}

impl Default for LockTimeout {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            jitter: Duration::from_millis(500),
            retry_interval: Duration::from_millis(20),
            retry_jitter: Duration::from_millis(20),
        }
    }
}

impl LockTimeout {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base,
            jitter,
            ..Self::default()
        }
    }

    fn draw_window(&self) -> Duration {
        self.base + random_below(self.jitter)
    }

    fn draw_sleep(&self) -> Duration {
        self.retry_interval + random_below(self.retry_jitter)
    }
}

fn random_below(limit: Duration) -> Duration {
    let millis = limit.as_millis() as u64;
    if millis == 0 {
        return Duration::from_millis(0);
    }
    Duration::from_millis(rand::thread_rng().gen_range(0, millis))
}

// Everything in here is only touched with the pool mutex held.
struct PoolState {
    pages: HashMap<HeapPageID, Pod<HeapPage>>,

    // least recently used at the front
    recency: VecDeque<HeapPageID>,

    lock_manager: LockManager,
}

impl PoolState {
    fn touch(&mut self, pid: &HeapPageID) {
        if let Some(pos) = self.recency.iter().position(|p| p == pid) {
            self.recency.remove(pos);
        }
        self.recency.push_back(*pid);
    }

    fn remove(&mut self, pid: &HeapPageID) -> Option<Pod<HeapPage>> {
        if let Some(pos) = self.recency.iter().position(|p| p == pid) {
            self.recency.remove(pos);
        }
        self.pages.remove(pid)
    }

    fn make_room(&mut self, capacity: usize) -> SmallResult {
        while self.pages.len() >= capacity {
            self.evict_page()?;
        }
        Ok(())
    }

    /// Discard the least recently used clean page.
    ///
    /// Dirty pages are never evicted (NO STEAL), neither are pages
    /// which are being modified right now.
    fn evict_page(&mut self) -> SmallResult {
        let victim = self.recency.iter().cloned().find(|pid| {
            match self.pages.get(pid).map(|pod| pod.try_read()) {
                Some(Ok(page)) => page.is_dirty().is_none(),
                _ => false,
            }
        });

        match victim {
            Some(pid) => {
                self.remove(&pid);
                debug!("page {} evicted", pid);
                Ok(())
            }
            None => Err(SmallError::with_kind(
                ErrorKind::BufferPoolFull,
                &format!("no clean page to evict, {} pages cached", self.pages.len()),
            )),
        }
    }

    fn dirty_pages(&self, tx: Option<&Transaction>) -> Vec<(HeapPageID, Pod<HeapPage>)> {
        self.pages
            .iter()
            .filter(|(_, pod)| match (pod.rl().is_dirty(), tx) {
                (Some(owner), Some(tx)) => owner == *tx,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .map(|(pid, pod)| (*pid, Arc::clone(pod)))
            .collect()
    }
}

/// BufferPool manages the reading and writing of pages into memory from
/// disk. Access methods call into it to retrieve pages, and it fetches
/// pages from the appropriate location.
///
/// The BufferPool is also responsible for locking; when a transaction
/// fetches a page, BufferPool checks that the transaction has the
/// appropriate locks to read/write the page.
///
/// Locks are held until `commit` or `abort` (strict two-phase locking),
/// dirty pages stay in memory until then (NO STEAL) and are written
/// when the transaction commits (FORCE).
pub struct BufferPool {
    capacity: usize,

    state: Mutex<PoolState>,

    catalog: Arc<dyn TableCatalog>,

    lock_timeout: LockTimeout,
}

impl BufferPool {
    /// Creates a BufferPool that caches up to `capacity` pages.
    pub fn new(capacity: usize, catalog: Arc<dyn TableCatalog>) -> Self {
        Self {
            capacity,
            state: Mutex::new(PoolState {
                pages: HashMap::new(),
                recency: VecDeque::new(),
                lock_manager: LockManager::new(),
            }),
            catalog,
            lock_timeout: LockTimeout::default(),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: LockTimeout) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn reset_page_size() {
        Self::set_page_size(DEFAULT_PAGE_SIZE);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get_table(&self, table_id: u32) -> Result<Arc<HeapTable>, SmallError> {
        self.catalog
            .get_table(table_id)
            .ok_or_else(|| SmallError::not_found(&format!("table {} not found", table_id)))
    }
}

// page access
impl BufferPool {
    /// Retrieve the specified page with the associated permissions.
    /// Will acquire a lock and may block if that lock is held by
    /// another transaction.
    ///
    /// The retrieved page should be looked up in the buffer pool. If it
    /// is present, it should be returned. If it is not present, it
    /// should be added to the buffer pool and returned. If there is
    /// insufficient space in the buffer pool, a page should be evicted
    /// and the new page should be added in its place.
    pub fn get_page(
        &self,
        tx: &Transaction,
        perm: Permission,
        pid: &HeapPageID,
    ) -> ResultPod<HeapPage> {
        self.request_lock(tx, &perm.to_lock(), pid)?;

        if let Some(pod) = self.lookup(pid) {
            return Ok(pod);
        }

        // Load without the pool mutex, disk io shouldn't stall other
        // transactions. Another holder of a shared lock may load the
        // same page meanwhile, only the first copy gets installed.
        let page = self.load_page(pid)?;

        let mut state = self.state.ml();
        if let Some(pod) = state.pages.get(pid).cloned() {
            state.touch(pid);
            return Ok(pod);
        }

        state.make_room(self.capacity)?;
        let pod = Arc::new(RwLock::new(page));
        state.pages.insert(*pid, Arc::clone(&pod));
        state.touch(pid);
        debug!("page {} loaded, cached pages: {}", pid, state.pages.len());
        Ok(pod)
    }

    fn lookup(&self, pid: &HeapPageID) -> Option<Pod<HeapPage>> {
        let mut state = self.state.ml();
        let pod = state.pages.get(pid).cloned()?;
        state.touch(pid);
        Some(pod)
    }

    fn load_page(&self, pid: &HeapPageID) -> Result<HeapPage, SmallError> {
        // stage 1: get table
        let table = self.get_table(pid.get_table_id())?;

        let pages_count = table.pages_count()?;
        if pid.page_index as usize >= pages_count {
            return Err(SmallError::not_found(&format!(
                "page {} is beyond the end of table {}, pages: {}",
                pid,
                table.get_name(),
                pages_count
            )));
        }

        // stage 2: read page content from disk
        let buf = table.read_page(pid)?;

        // stage 3: page instantiation
        HeapPage::new(pid, &buf, table.get_schema())
    }

    /// Spin until the lock is granted or the (randomized) window runs
    /// out. Running out of time means the transaction is likely in a
    /// deadlock, it has to be aborted.
    fn request_lock(&self, tx: &Transaction, lock: &Lock, pid: &HeapPageID) -> SmallResult {
        let start_time = Instant::now();
        let window = self.lock_timeout.draw_window();

        loop {
            if self.state.ml().lock_manager.grant(tx, lock, pid) {
                return Ok(());
            }

            if start_time.elapsed() >= window {
                break;
            }

            sleep(self.lock_timeout.draw_sleep());
        }

        error!(
            "acquire lock timeout
            request: <tx: {}, lock: {:?}, page_id: {}>
            waited: {:?}
            lock table: {:?}",
            tx,
            lock,
            pid,
            start_time.elapsed(),
            self.state.ml().lock_manager,
        );

        let err = SmallError::aborted(&format!("{} timeout on {:?} of {}", tx, lock, pid));
        if log_enabled!(Level::Debug) {
            err.show_backtrace();
        }
        Err(err)
    }

    /// Releases the lock on a page.
    ///
    /// Calling this is very risky, and may result in wrong behavior.
    /// It's only safe for pages the transaction read but didn't modify.
    pub fn release_lock(&self, tx: &Transaction, pid: &HeapPageID) {
        self.state.ml().lock_manager.release(tx, pid);
    }

    /// Return true if the specified transaction has a lock on the
    /// specified page.
    pub fn holds_lock(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.state.ml().lock_manager.holds(tx, pid)
    }
}

// tuple modification
impl BufferPool {
    /// Add a tuple to the specified table on behalf of the transaction.
    /// Will acquire a write lock on the page the tuple is added to and
    /// any other pages that are updated.
    ///
    /// The record id of `tuple` is set to its new location.
    pub fn insert_tuple(&self, tx: &Transaction, table_id: u32, tuple: &mut Tuple) -> SmallResult {
        let table = self.get_table(table_id)?;
        let pages = table.insert_tuple(self, tx, tuple)?;
        self.install_dirty_pages(tx, pages)
    }

    /// Remove the tuple from the table it belongs to, the table is
    /// found by the tuple's record id.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &Tuple) -> SmallResult {
        let rid = tuple.get_record_id().ok_or_else(|| {
            SmallError::not_found(&format!("tuple {} has no record id", tuple))
        })?;

        let table = self.get_table(rid.pid.get_table_id())?;
        let pages = table.delete_tuple(self, tx, tuple)?;
        self.install_dirty_pages(tx, pages)
    }

    /// Mark the pages dirty and make sure the cache holds exactly these
    /// copies. A page may have been evicted between the table modifying
    /// it and now, since it was still clean at that moment.
    fn install_dirty_pages(&self, tx: &Transaction, pages: Vec<Pod<HeapPage>>) -> SmallResult {
        for pod in pages {
            let pid = {
                let mut page = pod.wl();
                page.mark_dirty(Some(*tx));
                page.get_pid()
            };

            let mut state = self.state.ml();
            let cached = state.pages.get(&pid).map(|p| Arc::ptr_eq(p, &pod));
            match cached {
                Some(true) => {}
                Some(false) => {
                    warn!("stale copy of page {} in cache, replaced", pid);
                    state.pages.insert(pid, pod);
                }
                None => {
                    state.make_room(self.capacity)?;
                    state.pages.insert(pid, pod);
                }
            }
            state.touch(&pid);
        }
        Ok(())
    }
}

// transaction completion
impl BufferPool {
    /// Write all pages dirtied by the transaction to disk, then release
    /// all its locks.
    ///
    /// All pages are attempted even if some of them fail, the first
    /// error is returned.
    pub fn commit(&self, tx: &Transaction) -> SmallResult {
        let mut state = self.state.ml();

        let mut first_err = None;
        for (pid, pod) in state.dirty_pages(Some(tx)) {
            if let Err(e) = self.flush_page(&pid, &pod) {
                error!("flush page {} failed on commit of {}: {}", pid, tx, e);
                first_err.get_or_insert(e);
            }
        }

        state.lock_manager.release_all(tx);
        debug!("{} committed", tx);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Restore all pages dirtied by the transaction to their state on
    /// disk, then release all its locks. Nothing is written.
    pub fn abort(&self, tx: &Transaction) -> SmallResult {
        let mut state = self.state.ml();

        let mut first_err = None;
        for (pid, pod) in state.dirty_pages(Some(tx)) {
            if let Err(e) = pod.wl().rollback() {
                error!("rollback page {} failed on abort of {}: {}", pid, tx, e);
                first_err.get_or_insert(e);
            }
        }

        state.lock_manager.release_all(tx);
        debug!("{} aborted", tx);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Flush all dirty pages to disk.
    ///
    /// NB: Be careful using this routine -- it writes dirty data to
    /// disk so will break the NO STEAL policy if transactions are
    /// running.
    pub fn flush_all_pages(&self) -> SmallResult {
        let state = self.state.ml();
        for (pid, pod) in state.dirty_pages(None) {
            self.flush_page(&pid, &pod)?;
        }
        Ok(())
    }

    /// Write the content of a specific page to disk, the page becomes
    /// clean and its before-image is refreshed.
    fn flush_page(&self, pid: &HeapPageID, pod: &Pod<HeapPage>) -> SmallResult {
        let table = self.get_table(pid.get_table_id())?;

        let mut page = pod.wl();
        let data = page.get_page_data()?;
        table.write_page(pid, &data)?;
        page.mark_dirty(None);
        page.set_before_image()?;
        Ok(())
    }

    /// Remove the specific page id from the buffer pool without
    /// flushing it.
    pub fn discard_page(&self, pid: &HeapPageID) {
        self.state.ml().remove(pid);
    }
}

// inspection
impl BufferPool {
    pub fn cached_pages_count(&self) -> usize {
        self.state.ml().pages.len()
    }

    pub fn is_cached(&self, pid: &HeapPageID) -> bool {
        self.state.ml().pages.contains_key(pid)
    }

    /// Drop all cached pages and locks, nothing is written.
    pub fn clear(&self) {
        let mut state = self.state.ml();
        state.pages.clear();
        state.recency.clear();
        state.lock_manager.clear();
    }
}
