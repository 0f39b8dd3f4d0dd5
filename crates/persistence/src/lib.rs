/// SQLite content index
mod db;
mod repository;

pub use db::{init_db, init_memory_db};
pub use repository::{MediaItemRepository, SqliteIndex};
