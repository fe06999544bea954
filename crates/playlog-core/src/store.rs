//! Storage seam consumed by the collector and the inference queries

use crate::types::{PlaytimeItem, Snapshot};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Aggregate counts for status output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub subjects: usize,
    pub snapshots: usize,
    pub last_captured_at: Option<DateTime<Utc>>,
}

/// Append-only snapshot persistence
pub trait SnapshotStore {
    /// Append one batch captured at `captured_at` (now when absent).
    ///
    /// No deduplication. A batch is written atomically; returns rows written.
    fn append(
        &mut self,
        subject_id: &str,
        items: &[PlaytimeItem],
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<usize>;

    /// All snapshots of a subject ordered by item, then capture time
    fn fetch_ordered(&self, subject_id: &str) -> Result<Vec<Snapshot>>;

    /// Distinct subject ids, ascending
    fn list_subjects(&self) -> Result<Vec<String>>;

    /// Items of the newest capture for a subject
    fn latest_batch(&self, subject_id: &str) -> Result<Option<Vec<PlaytimeItem>>>;

    fn stats(&self) -> Result<StoreStats>;
}

/// Opens a fresh store handle for one unit of work
pub trait OpenStore: Send + Sync + 'static {
    type Store: SnapshotStore + Send;

    fn open(&self) -> Result<Self::Store>;
}
