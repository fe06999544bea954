//! Data directory layout, run records, export files and the collector lock

mod export;
mod io;
mod lock;
mod paths;
mod types;

pub use export::{export_sessions, read_sessions};
pub use io::{append_jsonl, atomic_write, read_jsonl};
pub use lock::{is_stale, LockError, RunLock, REFRESH_EVERY, STALE_AFTER};
pub use paths::{Paths, HOME_ENV};
pub use types::RunRecord;
