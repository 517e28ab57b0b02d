use std::{sync::Arc, time::Duration};

use small_heap_db::{
    buffer_pool::{BufferPool, LockTimeout},
    storage::{
        schema::{Field, Schema, Type},
        HeapTable,
    },
    utils, Database,
};
use tempfile::TempDir;

/// A database living in its own temporary directory, the directory is
/// removed when the context is dropped.
pub struct TestContext {
    pub db: Database,

    // keep the directory alive as long as the database
    _dir: TempDir,
}

impl TestContext {
    pub fn pool(&self) -> &Arc<BufferPool> {
        self.db.buffer_pool()
    }
}

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Create a database in a fresh directory.
pub fn setup(capacity: usize) -> TestContext {
    setup_with_timeout(capacity, LockTimeout::default())
}

pub fn setup_with_timeout(capacity: usize, lock_timeout: LockTimeout) -> TestContext {
    utils::init_log();

    let dir = tempfile::tempdir().unwrap();
    let db = Database::with_buffer_pool(dir.path(), |catalog| {
        BufferPool::new(capacity, catalog).with_lock_timeout(lock_timeout)
    })
    .unwrap();

    TestContext { db, _dir: dir }
}

/// A lock window short enough to make timeout tests fast.
pub fn short_timeout() -> LockTimeout {
    LockTimeout::new(Duration::from_millis(100), Duration::from_millis(50))
}

pub fn new_int_table(ctx: &TestContext, name: &str, columns: usize) -> Arc<HeapTable> {
    let schema = Schema::small_int_schema(columns, "");
    ctx.db.create_table(name, &schema).unwrap()
}

/// A schema whose tuples are so wide that a page of the default size
/// holds exactly one of them.
pub fn wide_schema() -> Schema {
    let mut fields = vec![Field::new("id", Type::Int64)];
    for i in 0..8 {
        fields.push(Field::new(&format!("payload-{}", i), Type::Bytes(255)));
    }
    Schema::new(fields)
}

pub fn new_wide_table(ctx: &TestContext, name: &str) -> Arc<HeapTable> {
    ctx.db.create_table(name, &wide_schema()).unwrap()
}
