use crate::error::SourceError;
use crate::parse;
use crate::SnapshotSource;
use playlog_core::{PlaytimeItem, Subject};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE, USER_AGENT};
use std::time::Duration;

pub const STEAM_COMMUNITY_BASE: &str = "https://steamcommunity.com";

const DEFAULT_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);
const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Reads the recent-games block of a community profile page.
///
/// Only games shown on the profile are reported, with lifetime hours
/// converted to minutes. A cookie header lets friends-only profiles through.
#[derive(Debug, Clone)]
pub struct ProfileScraper {
    client: reqwest::Client,
    base_url: String,
    attempts: u32,
    retry_delay: Duration,
}

impl ProfileScraper {
    pub fn new(cookies: Option<&str>, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_AGENT));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );
        if let Some(cookies) = cookies.map(str::trim).filter(|c| !c.is_empty()) {
            let mut value = HeaderValue::from_str(cookies)
                .map_err(|e| SourceError::Parse(format!("cookie header: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
            tracing::info!("using steam cookies for profile requests");
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: STEAM_COMMUNITY_BASE.to_string(),
            attempts: DEFAULT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, attempts: u32, delay: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.retry_delay = delay;
        self
    }

    /// Vanity alias wins over the numeric id when both are known
    pub fn profile_url(&self, subject: &Subject) -> String {
        match subject.alias.as_deref().filter(|a| !a.is_empty()) {
            Some(alias) => self.alias_url(alias),
            None => format!("{}/profiles/{}/", self.base_url, subject.subject_id),
        }
    }

    fn alias_url(&self, alias: &str) -> String {
        format!("{}/id/{}/", self.base_url, alias)
    }

    async fn fetch_page(&self, url: &str) -> Result<String, SourceError> {
        let mut attempt = 1;
        loop {
            tracing::debug!(url, attempt, "fetching profile page");
            match self.request(url).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.attempts => {
                    tracing::warn!(url, attempt, error = %e, "profile request failed, retrying");
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

impl SnapshotSource for ProfileScraper {
    async fn fetch_items(&self, subject: &Subject) -> Result<Vec<PlaytimeItem>, SourceError> {
        let page = self.fetch_page(&self.profile_url(subject)).await?;
        if parse::is_private_profile(&page) {
            return Err(SourceError::Private(subject.subject_id.clone()));
        }

        let games = parse::parse_recent_games(&page);
        let skipped = games.iter().filter(|g| g.app_id.is_none()).count();
        let items: Vec<PlaytimeItem> = games
            .into_iter()
            .filter_map(parse::RecentGame::into_item)
            .collect();

        tracing::debug!(
            subject = %subject.subject_id,
            player = parse::parse_player_name(&page).as_deref().unwrap_or("?"),
            games = items.len(),
            skipped,
            "scraped recent games"
        );
        Ok(items)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SourceError> {
        let page = self.fetch_page(&self.alias_url(alias)).await?;
        Ok(parse::parse_steamid(&page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> ProfileScraper {
        ProfileScraper::new(None, Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://localhost:1/")
    }

    #[test]
    fn test_profile_url_prefers_alias() {
        let s = scraper();
        assert_eq!(
            s.profile_url(&Subject::with_alias("76561197960287930", "rook")),
            "http://localhost:1/id/rook/"
        );
        assert_eq!(
            s.profile_url(&Subject::new("76561197960287930")),
            "http://localhost:1/profiles/76561197960287930/"
        );
    }

    #[test]
    fn test_bad_cookie_rejected() {
        let err = ProfileScraper::new(Some("a=b\nc"), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[test]
    fn test_retry_floor() {
        let s = scraper().with_retry(0, Duration::ZERO);
        assert_eq!(s.attempts, 1);
    }
}
