//! Snapshot persistence backends

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::{SqliteOpener, SqliteStore};
