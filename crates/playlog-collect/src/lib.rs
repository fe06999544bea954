//! Polling collector: alias resolution, the per-subject worker pool and the loop

mod collector;
mod resolve;

pub use collector::{BatchSummary, Collector, SubjectOutcome, DEFAULT_CONCURRENCY};
pub use resolve::{resolve_subjects, CollectError};
pub use tokio_util::sync::CancellationToken;
