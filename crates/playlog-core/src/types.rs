//! Core types for playtime tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One game as reported by a source at fetch time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaytimeItem {
    pub item_id: i64,
    #[serde(default)]
    pub item_name: Option<String>,
    /// Total minutes played as of the fetch, not a delta
    pub cumulative_value: u64,
}

impl PlaytimeItem {
    pub fn new(item_id: i64, item_name: Option<&str>, cumulative_value: u64) -> Self {
        Self {
            item_id,
            item_name: item_name.map(str::to_string),
            cumulative_value,
        }
    }
}

/// A stored observation of one item's counter for one subject
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub subject_id: String,
    pub item_id: i64,
    #[serde(default)]
    pub item_name: Option<String>,
    pub cumulative_value: u64,
}

impl Snapshot {
    pub fn from_item(subject_id: &str, captured_at: DateTime<Utc>, item: &PlaytimeItem) -> Self {
        Self {
            captured_at,
            subject_id: subject_id.to_string(),
            item_id: item.item_id,
            item_name: item.item_name.clone(),
            cumulative_value: item.cumulative_value,
        }
    }

    /// Item name, treating an empty string as absent
    pub fn known_name(&self) -> Option<&str> {
        self.item_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// An inferred interval during which an item's counter increased.
///
/// Serialized field names are the export file format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub subject_id: String,
    pub item_id: i64,
    pub item_name: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub value_delta: u64,
}

impl Session {
    pub fn duration(&self) -> chrono::Duration {
        self.window_end - self.window_start
    }
}

/// A player to collect, after alias resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Subject {
    pub fn new(subject_id: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            alias: None,
        }
    }

    pub fn with_alias(subject_id: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            alias: Some(alias.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_known_name_ignores_empty() {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut snap = Snapshot::from_item("s1", at, &PlaytimeItem::new(10, Some(""), 5));
        assert_eq!(snap.known_name(), None);

        snap.item_name = Some("Portal".to_string());
        assert_eq!(snap.known_name(), Some("Portal"));
    }

    #[test]
    fn test_session_json_field_names() {
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let session = Session {
            subject_id: "76561198000000001".to_string(),
            item_id: 570,
            item_name: "Dota 2".to_string(),
            window_start: start,
            window_end: start + chrono::Duration::minutes(45),
            value_delta: 40,
        };

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["subject_id"], "76561198000000001");
        assert_eq!(value["item_id"], 570);
        assert_eq!(value["window_start"], "2025-03-01T12:00:00Z");
        assert_eq!(value["window_end"], "2025-03-01T12:45:00Z");
        assert_eq!(value["value_delta"], 40);
        assert_eq!(session.duration().num_minutes(), 45);
    }

    #[test]
    fn test_item_backwards_compatible_without_name() {
        let parsed: PlaytimeItem =
            serde_json::from_str(r#"{"item_id":440,"cumulative_value":12}"#).unwrap();
        assert_eq!(parsed.item_name, None);
        assert_eq!(parsed.cumulative_value, 12);
    }
}
