use playlog_core::{AppConfig, SnapshotStore};
use playlog_store::SqliteOpener;
use playlog_telemetry::{read_jsonl, Paths, RunLock, RunRecord};
use std::path::Path;

pub fn run(config: Option<&Path>) -> anyhow::Result<()> {
    let paths = Paths::new()?;
    let report = status_report(&paths, &paths.config_or_default(config));
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn status_report(paths: &Paths, config_path: &Path) -> serde_json::Value {
    let mut output = serde_json::json!({
        "data_dir": paths.data_dir.display().to_string(),
        "config": { "path": config_path.display().to_string() },
    });

    let app_config = match AppConfig::load(config_path) {
        Ok(c) => {
            output["config"]["valid"] = serde_json::json!(true);
            output["config"]["source"] = serde_json::json!(c.source.kind);
            output["config"]["players"] = serde_json::json!(c.players.len());
            Some(c)
        }
        Err(e) => {
            output["config"]["valid"] = serde_json::json!(false);
            output["config"]["error"] = serde_json::json!(e.to_string());
            None
        }
    };

    if let Some(app_config) = &app_config {
        output["database"] = database_status(&SqliteOpener::new(
            app_config.database_path(&paths.data_dir),
        ));
    }

    let runs: Vec<RunRecord> = read_jsonl(&paths.runs_file()).unwrap_or_default();
    output["collector"] = serde_json::json!({
        "running": RunLock::is_held(&paths.lock_file()),
        "runs": runs.len(),
        "last_run": runs.last(),
    });

    output
}

fn database_status(opener: &SqliteOpener) -> serde_json::Value {
    let path = opener.db_path().display().to_string();
    match opener.open_existing() {
        Ok(None) => serde_json::json!({ "path": path, "exists": false }),
        Ok(Some(store)) => match store.stats() {
            Ok(stats) => serde_json::json!({
                "path": path,
                "exists": true,
                "subjects": stats.subjects,
                "snapshots": stats.snapshots,
                "last_captured_at": stats.last_captured_at,
            }),
            Err(e) => serde_json::json!({ "path": path, "exists": true, "error": format!("{e:#}") }),
        },
        Err(e) => serde_json::json!({ "path": path, "error": format!("{e:#}") }),
    }
}
