//! Change detection ahead of storage
//!
//! Independent of session inference: the gate only decides whether a fresh
//! batch differs enough from the newest stored one to be worth a write.

use crate::types::PlaytimeItem;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Default tolerance on cumulative values
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct ChangeGate {
    pub tolerance: f64,
}

impl ChangeGate {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Whether `fresh` should be persisted given the newest stored batch
    pub fn has_changed(&self, previous: Option<&[PlaytimeItem]>, fresh: &[PlaytimeItem]) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        if previous.len() != fresh.len() {
            return true;
        }

        let by_id: HashMap<i64, &PlaytimeItem> =
            previous.iter().map(|item| (item.item_id, item)).collect();

        fresh.iter().any(|item| match by_id.get(&item.item_id) {
            None => true,
            Some(old) => {
                let diff = item.cumulative_value as f64 - old.cumulative_value as f64;
                diff.abs() > self.tolerance
            }
        })
    }
}

impl Default for ChangeGate {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

/// Short digest over the key fields of a batch, for log correlation
pub fn fingerprint(items: &[PlaytimeItem]) -> String {
    let mut keyed: Vec<&PlaytimeItem> = items.iter().collect();
    keyed.sort_by_key(|item| item.item_id);

    let mut hasher = Sha256::new();
    for item in keyed {
        hasher.update(item.item_id.to_le_bytes());
        hasher.update(item.item_name.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
        hasher.update(item.cumulative_value.to_le_bytes());
    }

    hasher
        .finalize()
        .iter()
        .take(4)
        .map(|b| format!("{:02x}", b))
        .collect()
}
