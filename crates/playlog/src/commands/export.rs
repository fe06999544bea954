use playlog_core::{infer_for_subjects, BatchSessions, SnapshotStore};
use std::path::Path;

pub fn run(config: Option<&Path>, output: Option<&Path>, subjects: &[String]) -> anyhow::Result<()> {
    let (paths, app_config) = super::load(config)?;
    let store = super::open_existing(&paths, &app_config)?;
    let target = match output {
        Some(path) => path.to_path_buf(),
        None => app_config.export_path(&paths.data_dir),
    };

    let batch = export_from_store(&store, subjects, &target)?;
    println!(
        "✓ Exported {} session(s) to {}",
        batch.sessions.len(),
        target.display()
    );
    for failure in &batch.failures {
        eprintln!("  skipped {}: {}", failure.subject_id, failure.error);
    }
    Ok(())
}

/// Infer and write sessions; subjects that fail to load are reported, not fatal
fn export_from_store<S: SnapshotStore + ?Sized>(
    store: &S,
    subjects: &[String],
    target: &Path,
) -> anyhow::Result<BatchSessions> {
    let subjects = if subjects.is_empty() {
        store.list_subjects()?
    } else {
        subjects.to_vec()
    };

    let batch = infer_for_subjects(store, &subjects);
    playlog_telemetry::export_sessions(&batch.sessions, target)?;
    tracing::info!(
        subjects = subjects.len(),
        sessions = batch.sessions.len(),
        failures = batch.failures.len(),
        path = %target.display(),
        "exported sessions"
    );
    Ok(batch)
}
