//! Path resolution for the data directory

use std::path::{Path, PathBuf};

/// Environment override for the data directory
pub const HOME_ENV: &str = "PLAYLOG_HOME";

/// Resolves standard paths under the playlog data directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
}

impl Paths {
    /// Resolve from `PLAYLOG_HOME`, then the platform data directory
    pub fn new() -> std::io::Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::at(PathBuf::from(dir)));
        }

        let data = dirs::data_dir().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "data directory not found")
        })?;

        Ok(Self::at(data.join("playlog")))
    }

    /// Use an explicit data directory
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    /// Collection cycle records
    pub fn runs_file(&self) -> PathBuf {
        self.data_dir.join("runs.jsonl")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join("collector.lock")
    }

    /// Config path given on the command line, or the default one
    pub fn config_or_default(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_env_override() {
        let temp = tempfile::TempDir::new().unwrap();
        std::env::set_var(HOME_ENV, temp.path());
        let paths = Paths::new().unwrap();
        std::env::remove_var(HOME_ENV);

        assert_eq!(paths.data_dir, temp.path());
        assert!(paths.runs_file().ends_with("runs.jsonl"));
        assert!(paths.lock_file().ends_with("collector.lock"));
    }

    #[test]
    #[serial]
    fn test_platform_default() {
        std::env::remove_var(HOME_ENV);
        if let Ok(paths) = Paths::new() {
            assert!(paths.data_dir.ends_with("playlog"));
            assert!(paths.config_file().ends_with("playlog/config.toml"));
        }
    }

    #[test]
    fn test_explicit_config() {
        let paths = Paths::at("/data");
        assert_eq!(
            paths.config_or_default(Some(Path::new("/etc/playlog.toml"))),
            PathBuf::from("/etc/playlog.toml")
        );
        assert_eq!(
            paths.config_or_default(None),
            PathBuf::from("/data/config.toml")
        );
    }
}
