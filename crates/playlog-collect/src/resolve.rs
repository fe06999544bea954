use playlog_core::{PlayerConfig, Subject};
use playlog_source::{SnapshotSource, SourceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("vanity url {alias:?} did not resolve to a steam id")]
    UnresolvedAlias {
        alias: String,
        #[source]
        source: Option<SourceError>,
    },

    #[error("no players to collect")]
    NoSubjects,
}

/// Turn configured players into subjects, resolving vanity aliases.
///
/// Any alias that fails to resolve aborts setup. Duplicate ids keep the
/// first entry.
pub async fn resolve_subjects<S: SnapshotSource>(
    source: &S,
    players: &[PlayerConfig],
) -> Result<Vec<Subject>, CollectError> {
    let mut subjects: Vec<Subject> = Vec::with_capacity(players.len());

    for player in players {
        let subject = match (&player.steamid, &player.vanity_url) {
            (Some(id), alias) => Subject {
                subject_id: id.clone(),
                alias: alias.clone(),
            },
            (None, Some(alias)) => match source.resolve_alias(alias).await {
                Ok(Some(id)) => {
                    tracing::info!(alias = %alias, subject = %id, "resolved vanity url");
                    Subject::with_alias(id, alias.clone())
                }
                Ok(None) => {
                    return Err(CollectError::UnresolvedAlias {
                        alias: alias.clone(),
                        source: None,
                    })
                }
                Err(e) => {
                    return Err(CollectError::UnresolvedAlias {
                        alias: alias.clone(),
                        source: Some(e),
                    })
                }
            },
            (None, None) => continue,
        };

        if subjects.iter().any(|s| s.subject_id == subject.subject_id) {
            tracing::debug!(subject = %subject.subject_id, "duplicate player entry ignored");
            continue;
        }
        subjects.push(subject);
    }

    if subjects.is_empty() {
        return Err(CollectError::NoSubjects);
    }
    Ok(subjects)
}
