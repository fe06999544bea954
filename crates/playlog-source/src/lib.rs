//! Playtime sources: the Steam Web API and the community profile page

mod api;
mod cookies;
mod error;
pub mod parse;
mod scraper;

pub use api::{SteamApiClient, DEFAULT_REQUEST_TIMEOUT, STEAM_API_BASE};
pub use cookies::{load_cookies, COOKIES_ENV, COOKIES_FILE_ENV};
pub use error::SourceError;
pub use scraper::{ProfileScraper, STEAM_COMMUNITY_BASE};

use playlog_core::{AppConfig, PlaytimeItem, SourceKind, Subject};
use std::future::Future;
use std::time::Duration;

/// Anything that can report cumulative playtime for a subject
pub trait SnapshotSource {
    /// Current (item, cumulative minutes) pairs for the subject
    fn fetch_items(
        &self,
        subject: &Subject,
    ) -> impl Future<Output = Result<Vec<PlaytimeItem>, SourceError>> + Send;

    /// Subject id for a vanity alias, `None` when the alias is unknown
    fn resolve_alias(
        &self,
        alias: &str,
    ) -> impl Future<Output = Result<Option<String>, SourceError>> + Send;
}

/// The source selected by `[source] kind`
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    Api(SteamApiClient),
    Scraper(ProfileScraper),
}

impl ConfiguredSource {
    pub fn from_config(config: &AppConfig) -> Result<Self, SourceError> {
        let timeout = Duration::from_secs(config.polling.request_timeout_seconds);
        match config.source.kind {
            SourceKind::Api => Ok(Self::Api(SteamApiClient::with_timeout(
                config.api_key()?,
                timeout,
            )?)),
            SourceKind::Scraper => {
                let cookies = load_cookies();
                Ok(Self::Scraper(ProfileScraper::new(cookies.as_deref(), timeout)?))
            }
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Api(_) => SourceKind::Api,
            Self::Scraper(_) => SourceKind::Scraper,
        }
    }
}

impl SnapshotSource for ConfiguredSource {
    async fn fetch_items(&self, subject: &Subject) -> Result<Vec<PlaytimeItem>, SourceError> {
        match self {
            Self::Api(client) => client.fetch_items(subject).await,
            Self::Scraper(scraper) => scraper.fetch_items(subject).await,
        }
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SourceError> {
        match self {
            Self::Api(client) => client.resolve_alias(alias).await,
            Self::Scraper(scraper) => scraper.resolve_alias(alias).await,
        }
    }
}
