// storage/mod.rs
// Task result persistence

mod migrations;
mod pool;
mod result_store;

// Re-export commonly used items
pub use migrations::run_migrations;
pub use pool::init_db_pool_with_path;
pub use result_store::{InMemoryResultStore, SqliteResultStore, TaskResultStore};
