//! Collector configuration loaded from TOML

use crate::gate::DEFAULT_TOLERANCE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no API key configured: set {env_var} or source.api_key")]
    MissingApiKey { env_var: String },

    #[error("no players configured: add at least one [[players]] entry with steamid or vanity_url")]
    NoPlayers,

    #[error("{field} must be a positive integer")]
    NotPositive { field: &'static str },

    #[error("polling.change_tolerance must be a finite, non-negative number (got {0})")]
    InvalidTolerance(f64),
}

/// Which source implementation feeds the collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Steam Web API (owned games, minutes)
    #[default]
    Api,
    /// Community profile page (recent games, hours)
    Scraper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_api_key_env_var")]
    pub api_key_env_var: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            api_key: String::new(),
            api_key_env_var: default_api_key_env_var(),
        }
    }
}

/// A configured player, identified directly or through a vanity alias
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub steamid: Option<String>,
    #[serde(default)]
    pub vanity_url: Option<String>,
}

impl PlayerConfig {
    fn normalized(self) -> Option<Self> {
        let steamid = trimmed(self.steamid);
        let vanity_url = trimmed(self.vanity_url);
        if steamid.is_none() && vanity_url.is_none() {
            return None;
        }
        Some(Self {
            steamid,
            vanity_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_tolerance")]
    pub change_tolerance: f64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
            concurrency: default_concurrency(),
            request_timeout_seconds: default_request_timeout(),
            change_tolerance: default_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Relative paths resolve against the data directory
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub players: Vec<PlayerConfig>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(content)?;
        config.players = config
            .players
            .into_iter()
            .filter_map(PlayerConfig::normalized)
            .collect();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        if self.polling.interval_seconds == 0 {
            return Err(ConfigError::NotPositive {
                field: "polling.interval_seconds",
            });
        }
        if self.polling.concurrency == 0 {
            return Err(ConfigError::NotPositive {
                field: "polling.concurrency",
            });
        }
        if self.polling.request_timeout_seconds == 0 {
            return Err(ConfigError::NotPositive {
                field: "polling.request_timeout_seconds",
            });
        }
        // NaN would make every comparison in the gate read as unchanged
        let tolerance = self.polling.change_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance(tolerance));
        }
        Ok(())
    }

    /// API key from the environment, falling back to the file value
    pub fn api_key(&self) -> Result<String, ConfigError> {
        let from_env = std::env::var(&self.source.api_key_env_var)
            .map(|v| v.trim().to_string())
            .unwrap_or_default();
        let key = if from_env.is_empty() {
            self.source.api_key.trim().to_string()
        } else {
            from_env
        };

        if key.is_empty() {
            return Err(ConfigError::MissingApiKey {
                env_var: self.source.api_key_env_var.clone(),
            });
        }
        Ok(key)
    }

    /// Resolve the database path against a base directory
    pub fn database_path(&self, base: &Path) -> PathBuf {
        resolve_against(base, &self.storage.database_path)
    }

    pub fn export_path(&self, base: &Path) -> PathBuf {
        resolve_against(base, &self.export.output_path)
    }
}

/// Starter config written by `playlog init`
pub const DEFAULT_CONFIG_TOML: &str = r#"# playlog configuration

[source]
# "api" uses the Steam Web API, "scraper" reads the public profile page
kind = "api"
# Leave empty and export STEAM_WEB_API_KEY instead
api_key = ""
api_key_env_var = "STEAM_WEB_API_KEY"

# One entry per player: steamid, vanity_url, or both
[[players]]
vanity_url = "gabelogannewell"

[polling]
interval_seconds = 60
concurrency = 4
request_timeout_seconds = 20
change_tolerance = 0.01

[storage]
database_path = "playtime_log.sqlite"

[export]
output_path = "sessions.json"

[server]
bind = "127.0.0.1:8000"
"#;

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn default_api_key_env_var() -> String {
    "STEAM_WEB_API_KEY".to_string()
}

fn default_interval() -> u64 {
    60
}

fn default_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u64 {
    20
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}

fn default_database_path() -> PathBuf {
    PathBuf::from("playtime_log.sqlite")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("sessions.json")
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
