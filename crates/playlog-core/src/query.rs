//! Inference over stored snapshots

use crate::infer::{infer_sessions, sort_for_presentation};
use crate::store::SnapshotStore;
use crate::types::Session;
use anyhow::Result;

/// Default cap on sessions returned by a query
pub const DEFAULT_QUERY_LIMIT: usize = 2000;

/// Sessions inferred for many subjects, with per-subject failures kept apart
#[derive(Debug, Default)]
pub struct BatchSessions {
    pub sessions: Vec<Session>,
    pub failures: Vec<SubjectFailure>,
}

#[derive(Debug, Clone)]
pub struct SubjectFailure {
    pub subject_id: String,
    pub error: String,
}

impl BatchSessions {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Sessions for one subject in presentation order.
///
/// With a limit, only the `limit` most recently ended sessions are kept.
pub fn sessions_for_subject<S: SnapshotStore + ?Sized>(
    store: &S,
    subject_id: &str,
    limit: Option<usize>,
) -> Result<Vec<Session>> {
    let snapshots = store.fetch_ordered(subject_id)?;
    let mut sessions = infer_sessions(subject_id, &snapshots);

    if let Some(limit) = limit {
        if sessions.len() > limit {
            sessions.sort_by(|a, b| b.window_end.cmp(&a.window_end));
            sessions.truncate(limit);
        }
    }

    sort_for_presentation(&mut sessions);
    Ok(sessions)
}

/// Infer sessions for every subject; one subject failing never stops the rest
pub fn infer_for_subjects<S: SnapshotStore + ?Sized>(
    store: &S,
    subject_ids: &[String],
) -> BatchSessions {
    let mut batch = BatchSessions::default();

    for subject_id in subject_ids {
        match store.fetch_ordered(subject_id) {
            Ok(snapshots) => {
                let sessions = infer_sessions(subject_id, &snapshots);
                tracing::debug!(
                    subject = %subject_id,
                    snapshots = snapshots.len(),
                    sessions = sessions.len(),
                    "inferred sessions"
                );
                batch.sessions.extend(sessions);
            }
            Err(e) => {
                tracing::warn!(subject = %subject_id, error = %e, "failed to load snapshots");
                batch.failures.push(SubjectFailure {
                    subject_id: subject_id.clone(),
                    error: format!("{:#}", e),
                });
            }
        }
    }

    sort_for_presentation(&mut batch.sessions);
    batch
}
