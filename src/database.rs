use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use log::info;

use crate::{
    buffer_pool::{BufferPool, DEFAULT_PAGES},
    catalog::{Catalog, TableCatalog},
    error::SmallError,
    storage::{schema::Schema, HeapTable},
};

/// A data directory with its catalog and buffer pool.
///
/// Every table lives in `<path>/<name>.table`.
pub struct Database {
    path: PathBuf,

    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, SmallError> {
        Self::with_capacity(path, DEFAULT_PAGES)
    }

    pub fn with_capacity<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self, SmallError> {
        Self::with_buffer_pool(path, |catalog| BufferPool::new(capacity, catalog))
    }

    /// Open the database with a customized buffer pool, `build` receives
    /// the catalog the pool must be bound to.
    pub fn with_buffer_pool<P, F>(path: P, build: F) -> Result<Self, SmallError>
    where
        P: AsRef<Path>,
        F: FnOnce(Arc<dyn TableCatalog>) -> BufferPool,
    {
        let path = path.as_ref().to_path_buf();
        fs::create_dir_all(&path)?;

        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(build(Arc::clone(&catalog) as Arc<dyn TableCatalog>));

        info!(
            "database opened at {:?}, buffer pool capacity: {}",
            path,
            buffer_pool.capacity()
        );

        Ok(Self {
            path,
            catalog,
            buffer_pool,
        })
    }

    pub fn get_path(&self) -> &Path {
        &self.path
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }

    /// Create (or open, if the file exists) a table and register it in
    /// the catalog.
    pub fn create_table(&self, name: &str, schema: &Schema) -> Result<Arc<HeapTable>, SmallError> {
        let table_path = self.path.join(name).with_extension("table");
        let table = Arc::new(HeapTable::new(name, table_path, schema)?);
        self.catalog.add_table(Arc::clone(&table));
        Ok(table)
    }
}
