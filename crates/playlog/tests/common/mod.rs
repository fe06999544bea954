use chrono::{DateTime, Duration, TimeZone, Utc};
use playlog_core::PlaytimeItem;

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 19, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn dota(minutes: u64) -> PlaytimeItem {
    PlaytimeItem::new(570, Some("Dota 2"), minutes)
}

pub fn unnamed(item_id: i64, minutes: u64) -> PlaytimeItem {
    PlaytimeItem::new(item_id, None, minutes)
}
