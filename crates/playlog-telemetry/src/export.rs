//! Session export as a JSON array

use crate::io::atomic_write;
use playlog_core::{sort_for_presentation, Session};
use std::path::Path;

/// Write sessions sorted by subject, item and window start. Returns the count.
pub fn export_sessions(sessions: &[Session], path: &Path) -> std::io::Result<usize> {
    let mut sorted = sessions.to_vec();
    sort_for_presentation(&mut sorted);

    let json = serde_json::to_string_pretty(&sorted)?;
    atomic_write(path, json.as_bytes())?;
    Ok(sorted.len())
}

pub fn read_sessions(path: &Path) -> std::io::Result<Vec<Session>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
