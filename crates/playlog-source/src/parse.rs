//! Text extraction from Steam community profile pages.
//!
//! Profile markup is matched with a handful of regexes rather than a DOM;
//! only the recent-games block and a few identity fields are read.

use playlog_core::PlaytimeItem;
use regex::Regex;
use std::sync::OnceLock;

static GAME_NAME_RE: OnceLock<Regex> = OnceLock::new();
static APP_LINK_RE: OnceLock<Regex> = OnceLock::new();
static DETAILS_RE: OnceLock<Regex> = OnceLock::new();
static TOTAL_HOURS_RE: OnceLock<Regex> = OnceLock::new();
static PERSONA_RE: OnceLock<Regex> = OnceLock::new();
static TITLE_RE: OnceLock<Regex> = OnceLock::new();
static STEAMID_RE: OnceLock<Regex> = OnceLock::new();

const RECENT_GAMES_MARKER: &str = r#"class="recent_games""#;
const RECENT_GAME_MARKER: &str = r#"class="recent_game""#;

const PRIVATE_MARKERS: &[&str] = &[
    "profile_private_info",
    "This profile is private",
    "此用户尚未设置他们的个人资料为公开",
    "此个人资料是私密的",
];

/// One entry of the profile's recent-activity block
#[derive(Debug, Clone, PartialEq)]
pub struct RecentGame {
    pub app_id: Option<i64>,
    pub name: String,
    /// Lifetime hours shown on the page, 0 when the page omits them
    pub total_hours: f64,
}

impl RecentGame {
    /// Converts to an item in whole minutes; entries without an app id are dropped
    pub fn into_item(self) -> Option<PlaytimeItem> {
        let app_id = self.app_id?;
        Some(PlaytimeItem {
            item_id: app_id,
            item_name: Some(self.name),
            cumulative_value: hours_to_minutes(self.total_hours),
        })
    }
}

pub fn hours_to_minutes(hours: f64) -> u64 {
    if !hours.is_finite() || hours <= 0.0 {
        return 0;
    }
    (hours * 60.0).round() as u64
}

pub fn is_private_profile(html: &str) -> bool {
    PRIVATE_MARKERS.iter().any(|marker| html.contains(marker))
}

/// Games listed in the recent-activity block, in page order
pub fn parse_recent_games(html: &str) -> Vec<RecentGame> {
    let Some(start) = html.find(RECENT_GAMES_MARKER) else {
        return Vec::new();
    };

    html[start..]
        .split(RECENT_GAME_MARKER)
        .skip(1)
        .filter_map(parse_game_block)
        .collect()
}

/// Recent games converted to items, skipping those without an app id
pub fn parse_items(html: &str) -> Vec<PlaytimeItem> {
    parse_recent_games(html)
        .into_iter()
        .filter_map(RecentGame::into_item)
        .collect()
}

fn parse_game_block(block: &str) -> Option<RecentGame> {
    let name_re = GAME_NAME_RE.get_or_init(|| {
        Regex::new(r#"(?s)class="game_name"[^>]*>\s*(?:<a[^>]*?href="([^"]*)"[^>]*>)?\s*([^<]+?)\s*<"#)
            .expect("game name regex")
    });
    let app_re = APP_LINK_RE.get_or_init(|| Regex::new(r"/app/(\d+)").expect("app link regex"));

    let caps = name_re.captures(block)?;
    let name = decode_entities(caps.get(2)?.as_str().trim());
    if name.is_empty() {
        return None;
    }

    let app_id = caps
        .get(1)
        .and_then(|href| app_re.captures(href.as_str()))
        .or_else(|| app_re.captures(block))
        .and_then(|c| c[1].parse::<i64>().ok());

    Some(RecentGame {
        app_id,
        name,
        total_hours: total_hours(block).unwrap_or(0.0),
    })
}

fn total_hours(block: &str) -> Option<f64> {
    let details_re = DETAILS_RE.get_or_init(|| {
        Regex::new(r#"(?s)class="game_info_details"[^>]*>(.*?)</div>"#).expect("details regex")
    });
    let hours_re = TOTAL_HOURS_RE.get_or_init(|| {
        Regex::new(r"(?:总时数\s*([\d,]+(?:\.\d+)?)\s*小时)|(?:([\d,]+(?:\.\d+)?)\s*hrs?\s+on\s+record)")
            .expect("hours regex")
    });

    let details = details_re.captures(block)?;
    let caps = hours_re.captures(details.get(1)?.as_str())?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
    raw.replace(',', "").parse().ok()
}

/// Display name from the persona span, else from the page title after "::"
pub fn parse_player_name(html: &str) -> Option<String> {
    let persona_re = PERSONA_RE.get_or_init(|| {
        Regex::new(r#"class="actual_persona_name"[^>]*>([^<]*)<"#).expect("persona regex")
    });
    let title_re =
        TITLE_RE.get_or_init(|| Regex::new(r"(?s)<title>(.*?)</title>").expect("title regex"));

    if let Some(caps) = persona_re.captures(html) {
        let name = decode_entities(caps[1].trim());
        if !name.is_empty() {
            return Some(name);
        }
    }

    let title = title_re.captures(html)?;
    let (_, name) = title[1].rsplit_once("::")?;
    let name = decode_entities(name.trim());
    (!name.is_empty()).then_some(name)
}

/// 64-bit steam id embedded in the profile data script
pub fn parse_steamid(html: &str) -> Option<String> {
    let re = STEAMID_RE
        .get_or_init(|| Regex::new(r#""steamid"\s*:\s*"(\d{17})""#).expect("steamid regex"));
    re.captures(html).map(|c| c[1].to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
