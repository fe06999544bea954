//! Single-collector lock file

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;

/// Locks older than this are treated as left behind by a dead process
pub const STALE_AFTER: Duration = Duration::from_secs(300);

/// How often a live collector rewrites its lock; well under `STALE_AFTER`
pub const REFRESH_EVERY: Duration = Duration::from_secs(100);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another collector is running ({path}): {holder}")]
    Held { path: PathBuf, holder: String },

    #[error("lock file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("lock {path} was taken over by another collector")]
    Lost { path: PathBuf },
}

/// Held for the lifetime of a collector run; removes the file on drop.
///
/// The file carries a per-lock token, so a handle whose lock was replaced
/// never rewrites or deletes the new owner's file.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    token: String,
}

impl RunLock {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        Self::acquire_with(path, STALE_AFTER)
    }

    pub fn acquire_with(path: &Path, stale_after: Duration) -> Result<Self, LockError> {
        let io_err = |source| LockError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        if path.exists() {
            let holder = std::fs::read_to_string(path).unwrap_or_default();
            if is_stale(path, stale_after) {
                tracing::warn!(path = %path.display(), holder = %holder.trim(), "removing stale lock");
                std::fs::remove_file(path).map_err(io_err)?;
            } else {
                return Err(LockError::Held {
                    path: path.to_path_buf(),
                    holder: holder.trim().to_string(),
                });
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(LockError::Held {
                    path: path.to_path_buf(),
                    holder: String::new(),
                });
            }
            Err(e) => return Err(io_err(e)),
        };
        let token = new_token();
        writeln!(
            file,
            "{} started={}",
            token,
            chrono::Utc::now().to_rfc3339()
        )
        .map_err(io_err)?;

        tracing::debug!(path = %path.display(), "acquired collector lock");
        Ok(Self {
            path: path.to_path_buf(),
            token,
        })
    }

    /// Rewrite the lock so a long-running loop never looks stale.
    ///
    /// Fails with `Lost` once another collector has replaced the file.
    pub fn refresh(&self) -> Result<(), LockError> {
        if !self.is_owned() {
            return Err(LockError::Lost {
                path: self.path.clone(),
            });
        }
        std::fs::write(
            &self.path,
            format!(
                "{} refreshed={}\n",
                self.token,
                chrono::Utc::now().to_rfc3339()
            ),
        )
        .map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Whether the file on disk is still this lock's
    pub fn is_owned(&self) -> bool {
        std::fs::read_to_string(&self.path)
            .map(|content| content.split_whitespace().next() == Some(self.token.as_str()))
            .unwrap_or(false)
    }

    /// A lock file exists and is fresh enough that `acquire` would refuse it
    pub fn is_held(path: &Path) -> bool {
        path.exists() && !is_stale(path, STALE_AFTER)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if !self.is_owned() {
            tracing::warn!(path = %self.path.display(), "lock file is no longer ours, leaving it");
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove lock");
        }
    }
}

fn new_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("pid={}:{}", std::process::id(), nanos)
}

/// True when the file's mtime is older than `stale_after`
pub fn is_stale(path: &Path, stale_after: Duration) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| SystemTime::now().duration_since(modified).ok())
        .map(|age| age > stale_after)
        .unwrap_or(false)
}
