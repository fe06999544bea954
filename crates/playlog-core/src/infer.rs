//! Session inference from cumulative playtime snapshots

use crate::types::{Session, Snapshot};
use std::collections::HashMap;

/// Infer play sessions for one subject.
///
/// Snapshots are grouped by item, keeping their input order inside each
/// group, and every adjacent pair inside a group is compared. A pair whose
/// counter went up yields one session spanning the two capture times; flat or
/// decreasing pairs yield nothing. Output follows item first-appearance order.
pub fn infer_sessions(subject_id: &str, snapshots: &[Snapshot]) -> Vec<Session> {
    let mut sessions = Vec::new();

    for (item_id, group) in group_by_item(snapshots) {
        if group.len() < 2 {
            continue;
        }

        for pair in group.windows(2) {
            let (prev, current) = (pair[0], pair[1]);
            if current.cumulative_value <= prev.cumulative_value {
                continue;
            }

            sessions.push(Session {
                subject_id: subject_id.to_string(),
                item_id,
                item_name: resolve_name(item_id, prev, current),
                window_start: prev.captured_at,
                window_end: current.captured_at,
                value_delta: current.cumulative_value - prev.cumulative_value,
            });
        }
    }

    sessions
}

/// Placeholder name for an item no snapshot ever named
pub fn placeholder_name(item_id: i64) -> String {
    format!("appid {}", item_id)
}

/// Sort sessions the way exports and queries present them
pub fn sort_for_presentation(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| {
        a.subject_id
            .cmp(&b.subject_id)
            .then(a.item_id.cmp(&b.item_id))
            .then(a.window_start.cmp(&b.window_start))
    });
}

fn resolve_name(item_id: i64, prev: &Snapshot, current: &Snapshot) -> String {
    current
        .known_name()
        .or_else(|| prev.known_name())
        .map(str::to_string)
        .unwrap_or_else(|| placeholder_name(item_id))
}

fn group_by_item(snapshots: &[Snapshot]) -> Vec<(i64, Vec<&Snapshot>)> {
    let mut slots: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<(i64, Vec<&Snapshot>)> = Vec::new();

    for snap in snapshots {
        let slot = *slots.entry(snap.item_id).or_insert_with(|| {
            groups.push((snap.item_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(snap);
    }

    groups
}
