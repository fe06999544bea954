use playlog_core::ConfigError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} answered HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("profile {0} is private")]
    Private(String),

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SourceError {
    /// Connection and timeout failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_connect() || e.is_timeout(),
            SourceError::Timeout(_) => true,
            _ => false,
        }
    }
}
