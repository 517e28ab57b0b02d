use core::fmt;
use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use super::Transaction;
use crate::storage::HeapPageID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lock {
    XLock,
    SLock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_lock(&self) -> Lock {
        match self {
            Permission::ReadOnly => Lock::SLock,
            Permission::ReadWrite => Lock::XLock,
        }
    }
}

/// The page-level lock table.
///
/// The lock manager never blocks, it only answers whether a lock can be
/// granted right now. Waiting and timeouts are handled by the caller
/// (see `BufferPool::get_page`), which also serializes all calls.
///
/// Invariant: for a given page, the x-lock holder and the s-lock
/// holders are never different transactions, and a transaction is
/// never left in both maps.
#[derive(Default)]
pub struct LockManager {
    s_lock_map: HashMap<HeapPageID, HashSet<Transaction>>,
    x_lock_map: HashMap<HeapPageID, Transaction>,

    // reverse index used by `release_all`
    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to add a lock to the given page. This api is idempotent.
    ///
    /// # Return
    ///
    /// Return a bool value to indicate whether the lock is granted.
    pub fn grant(&mut self, tx: &Transaction, lock: &Lock, page_id: &HeapPageID) -> bool {
        // If the page is held by another transaction with X-Lock, the
        // request fails no matter which lock is requested.
        if let Some(owner) = self.x_lock_map.get(page_id) {
            if owner != tx {
                return false;
            }
        }

        let granted = match lock {
            Lock::SLock => {
                // The owner of the X-Lock can read the page already,
                // don't add it to the sharers.
                if !self.x_lock_map.contains_key(page_id) {
                    self.s_lock_map
                        .entry(*page_id)
                        .or_insert_with(HashSet::new)
                        .insert(*tx);
                }
                true
            }
            Lock::XLock => self.grant_exclusive(tx, page_id),
        };

        if granted {
            self.hold_pages
                .entry(*tx)
                .or_insert_with(HashSet::new)
                .insert(*page_id);
        }
        granted
    }

    fn grant_exclusive(&mut self, tx: &Transaction, page_id: &HeapPageID) -> bool {
        if self.x_lock_map.get(page_id) == Some(tx) {
            return true;
        }

        if let Some(sharers) = self.s_lock_map.get(page_id) {
            // Either several sharers, or a single sharer which is
            // another transaction: cannot upgrade.
            if sharers.len() > 1 || (sharers.len() == 1 && !sharers.contains(tx)) {
                return false;
            }

            // upgrade, the transaction stops being a sharer
            self.s_lock_map.remove(page_id);
        }

        self.x_lock_map.insert(*page_id, *tx);
        true
    }

    /// Release both the S-Lock and the X-Lock of the transaction on the
    /// page, no-op if the transaction holds neither.
    pub fn release(&mut self, tx: &Transaction, page_id: &HeapPageID) {
        if let Some(sharers) = self.s_lock_map.get_mut(page_id) {
            sharers.remove(tx);
            if sharers.is_empty() {
                self.s_lock_map.remove(page_id);
            }
        }

        if self.x_lock_map.get(page_id) == Some(tx) {
            self.x_lock_map.remove(page_id);
        }

        if let Some(pages) = self.hold_pages.get_mut(tx) {
            pages.remove(page_id);
            if pages.is_empty() {
                self.hold_pages.remove(tx);
            }
        }
    }

    /// Release every lock held by the transaction.
    pub fn release_all(&mut self, tx: &Transaction) {
        let pages = match self.hold_pages.remove(tx) {
            Some(pages) => pages,
            None => return,
        };

        for page_id in pages {
            self.release(tx, &page_id);
        }
    }

    pub fn holds(&self, tx: &Transaction, page_id: &HeapPageID) -> bool {
        if let Some(sharers) = self.s_lock_map.get(page_id) {
            if sharers.contains(tx) {
                return true;
            }
        }

        self.x_lock_map.get(page_id) == Some(tx)
    }

    pub fn exclusive_owner(&self, page_id: &HeapPageID) -> Option<Transaction> {
        self.x_lock_map.get(page_id).cloned()
    }

    pub fn sharers(&self, page_id: &HeapPageID) -> Vec<Transaction> {
        self.s_lock_map
            .get(page_id)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get_hold_pages(&self, tx: &Transaction) -> HashSet<HeapPageID> {
        self.hold_pages.get(tx).cloned().unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.s_lock_map.clear();
        self.x_lock_map.clear();
        self.hold_pages.clear();
    }
}

impl fmt::Display for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depiction = "\n".to_string();

        // s_lock_map
        depiction.push_str("s_lock_map: {");
        for (k, v) in self.s_lock_map.iter() {
            depiction.push_str(&format!(
                "\n\t{} -> [{}]",
                k.get_short_repr(),
                v.iter().join(", ")
            ));
        }
        depiction.push_str("\n}\n");

        // x_lock_map
        depiction.push_str("x_lock_map: {");
        for (k, v) in self.x_lock_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {}", k.get_short_repr(), v));
        }
        depiction.push_str("\n}\n");

        // hold_pages
        depiction.push_str("hold_pages: {");
        for (k, v) in self.hold_pages.iter() {
            depiction.push_str(&format!(
                "\n\t{} -> [{}]",
                k,
                v.iter().map(|pid| pid.get_short_repr()).join(", ")
            ));
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for LockManager {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
