use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use playlog_core::{OpenStore, PlaytimeItem, Snapshot, SnapshotStore, StoreStats};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process store; clones share the same rows
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Arc<Mutex<Vec<Snapshot>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Snapshot>>> {
        self.rows
            .lock()
            .map_err(|_| anyhow!("memory store poisoned"))
    }
}

impl SnapshotStore for MemoryStore {
    fn append(
        &mut self,
        subject_id: &str,
        items: &[PlaytimeItem],
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        let at = captured_at.unwrap_or_else(Utc::now);
        let mut rows = self.lock()?;
        rows.extend(
            items
                .iter()
                .map(|item| Snapshot::from_item(subject_id, at, item)),
        );
        Ok(items.len())
    }

    fn fetch_ordered(&self, subject_id: &str) -> Result<Vec<Snapshot>> {
        let mut matching: Vec<Snapshot> = self
            .lock()?
            .iter()
            .filter(|s| s.subject_id == subject_id)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for identical capture times
        matching.sort_by(|a, b| {
            a.item_id
                .cmp(&b.item_id)
                .then(a.captured_at.cmp(&b.captured_at))
        });
        Ok(matching)
    }

    fn list_subjects(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.lock()?.iter().map(|s| s.subject_id.clone()).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    fn latest_batch(&self, subject_id: &str) -> Result<Option<Vec<PlaytimeItem>>> {
        let rows = self.lock()?;
        let latest = rows
            .iter()
            .filter(|s| s.subject_id == subject_id)
            .map(|s| s.captured_at)
            .max();
        let Some(latest) = latest else {
            return Ok(None);
        };

        let mut items: Vec<PlaytimeItem> = rows
            .iter()
            .filter(|s| s.subject_id == subject_id && s.captured_at == latest)
            .map(|s| PlaytimeItem {
                item_id: s.item_id,
                item_name: s.item_name.clone(),
                cumulative_value: s.cumulative_value,
            })
            .collect();
        items.sort_by_key(|item| item.item_id);
        Ok(Some(items))
    }

    fn stats(&self) -> Result<StoreStats> {
        let subjects = self.list_subjects()?.len();
        let rows = self.lock()?;
        Ok(StoreStats {
            subjects,
            snapshots: rows.len(),
            last_captured_at: rows.iter().map(|s| s.captured_at).max(),
        })
    }
}

impl OpenStore for MemoryStore {
    type Store = MemoryStore;

    fn open(&self) -> Result<MemoryStore> {
        Ok(self.clone())
    }
}
