use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use log::info;

use crate::{
    storage::{schema::Schema, HeapTable},
    utils::HandyRwLock,
};

/// What the buffer pool needs to know about tables: how to reach the
/// file and the schema of a table id.
pub trait TableCatalog: Send + Sync {
    fn get_table(&self, table_id: u32) -> Option<Arc<HeapTable>>;

    fn get_schema(&self, table_id: u32) -> Option<Schema> {
        self.get_table(table_id).map(|t| t.get_schema().clone())
    }
}

/// An in-memory catalog, tables are registered at runtime and never
/// persisted.
#[derive(Default)]
pub struct Catalog {
    map: RwLock<HashMap<Key, Value>>,
}

type Key = u32;
type Value = Arc<HeapTable>;

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table, a table with the same id is replaced.
    pub fn add_table(&self, table: Value) {
        info!("add table {} to catalog", table);
        self.map.wl().insert(table.get_id(), table);
    }

    pub fn get_table_by_name(&self, name: &str) -> Option<Value> {
        self.map
            .rl()
            .values()
            .find(|t| t.get_name() == name)
            .cloned()
    }

    pub fn clear(&self) {
        self.map.wl().clear();
    }
}

impl TableCatalog for Catalog {
    fn get_table(&self, table_id: u32) -> Option<Arc<HeapTable>> {
        self.map.rl().get(&table_id).cloned()
    }
}
