use playlog_core::{sessions_for_subject, Session};
use std::path::Path;

pub fn run(config: Option<&Path>, subject: &str, limit: usize, json: bool) -> anyhow::Result<()> {
    let (paths, app_config) = super::load(config)?;
    let store = super::open_existing(&paths, &app_config)?;
    let sessions = sessions_for_subject(&store, subject, effective_limit(limit))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions for {}", subject);
        return Ok(());
    }

    println!("Sessions for {} ({})", subject, sessions.len());
    println!("======================");
    for session in &sessions {
        println!("{}", format_row(session));
    }
    Ok(())
}

/// Zero disables truncation
fn effective_limit(limit: usize) -> Option<usize> {
    (limit > 0).then_some(limit)
}

fn format_row(session: &Session) -> String {
    format!(
        "  {} → {} | {:>5} min | {}",
        session.window_start.format("%Y-%m-%d %H:%M"),
        session.window_end.format("%H:%M"),
        session.value_delta,
        session.item_name,
    )
}
