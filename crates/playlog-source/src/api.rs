use crate::error::SourceError;
use crate::SnapshotSource;
use playlog_core::{PlaytimeItem, Subject};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

pub const STEAM_API_BASE: &str = "https://api.steampowered.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const OWNED_GAMES_PATH: &str = "/IPlayerService/GetOwnedGames/v1/";
const RESOLVE_VANITY_PATH: &str = "/ISteamUser/ResolveVanityURL/v1/";

#[derive(Debug, Default, Deserialize)]
struct OwnedGamesEnvelope {
    #[serde(default)]
    response: OwnedGamesResponse,
}

#[derive(Debug, Default, Deserialize)]
struct OwnedGamesResponse {
    #[serde(default)]
    games: Option<Vec<OwnedGame>>,
}

#[derive(Debug, Deserialize)]
struct OwnedGame {
    appid: Option<i64>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    playtime_forever: u64,
}

#[derive(Debug, Default, Deserialize)]
struct VanityEnvelope {
    #[serde(default)]
    response: VanityResponse,
}

#[derive(Debug, Default, Deserialize)]
struct VanityResponse {
    #[serde(default)]
    success: i64,
    #[serde(default)]
    steamid: Option<String>,
}

/// Steam Web API client reporting lifetime minutes for every owned game
#[derive(Debug, Clone)]
pub struct SteamApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SteamApiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        Self::with_timeout(api_key, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeout(api_key: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: STEAM_API_BASE.to_string(),
        })
    }

    /// Point at a different host, e.g. a local stub
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn owned_games(&self, steamid: &str) -> Result<Vec<PlaytimeItem>, SourceError> {
        let envelope: OwnedGamesEnvelope = self
            .get_json(
                OWNED_GAMES_PATH,
                &[
                    ("steamid", steamid),
                    ("include_appinfo", "1"),
                    ("include_played_free_games", "1"),
                ],
            )
            .await?;
        Ok(owned_games_to_items(envelope))
    }

    pub async fn resolve_vanity_url(&self, vanity: &str) -> Result<Option<String>, SourceError> {
        let envelope: VanityEnvelope = self
            .get_json(RESOLVE_VANITY_PATH, &[("vanityurl", vanity)])
            .await?;
        Ok(resolved_steamid(envelope))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let mut query = vec![("key", self.api_key.as_str()), ("format", "json")];
        query.extend_from_slice(params);

        let url = reqwest::Url::parse_with_params(&format!("{}{}", self.base_url, path), &query)
            .map_err(|e| SourceError::Parse(format!("bad url for {}: {}", path, e)))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            // The endpoint path is reported instead of the url so the key stays out of logs
            return Err(SourceError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| SourceError::Parse(format!("{}: {}", path, e)))
    }
}

impl SnapshotSource for SteamApiClient {
    async fn fetch_items(&self, subject: &Subject) -> Result<Vec<PlaytimeItem>, SourceError> {
        let items = self.owned_games(&subject.subject_id).await?;
        tracing::debug!(subject = %subject.subject_id, games = items.len(), "fetched owned games");
        Ok(items)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SourceError> {
        self.resolve_vanity_url(alias).await
    }
}

fn owned_games_to_items(envelope: OwnedGamesEnvelope) -> Vec<PlaytimeItem> {
    envelope
        .response
        .games
        .unwrap_or_default()
        .into_iter()
        .filter_map(|game| {
            Some(PlaytimeItem {
                item_id: game.appid?,
                item_name: game.name,
                cumulative_value: game.playtime_forever,
            })
        })
        .collect()
}

fn resolved_steamid(envelope: VanityEnvelope) -> Option<String> {
    let response = envelope.response;
    if response.success != 1 {
        return None;
    }
    response.steamid.filter(|id| !id.is_empty())
}
