use anyhow::Context;
use playlog_collect::{resolve_subjects, BatchSummary, CancellationToken, Collector};
use playlog_core::{AppConfig, ChangeGate};
use playlog_store::SqliteOpener;
use playlog_source::ConfiguredSource;
use playlog_telemetry::{append_jsonl, Paths, RunLock, RunRecord, REFRESH_EVERY};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn run(config: Option<&Path>, once: bool) -> anyhow::Result<()> {
    let (paths, app_config) = super::load(config)?;
    let lock = RunLock::acquire(&paths.lock_file())?;

    let source = ConfiguredSource::from_config(&app_config)?;
    let opener = super::opener(&paths, &app_config);
    tracing::info!(
        source = ?source.kind(),
        database = %opener.db_path().display(),
        players = app_config.players.len(),
        lock = %lock.path().display(),
        "starting collector"
    );

    super::runtime()?.block_on(collect(paths, app_config, source, opener, lock, once))
}

async fn collect(
    paths: Paths,
    app_config: AppConfig,
    source: ConfiguredSource,
    opener: SqliteOpener,
    lock: RunLock,
    once: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let keeper = spawn_lock_keeper(Arc::new(lock), REFRESH_EVERY, cancel.clone());
    let result = poll(&paths, &app_config, source, opener, &cancel, once).await;
    cancel.cancel();
    if let Err(e) = keeper.await {
        tracing::warn!("lock keeper task failed: {e}");
    }
    result
}

async fn poll(
    paths: &Paths,
    app_config: &AppConfig,
    source: ConfiguredSource,
    opener: SqliteOpener,
    cancel: &CancellationToken,
    once: bool,
) -> anyhow::Result<()> {
    let subjects = resolve_subjects(&source, &app_config.players).await?;
    let collector = Collector::new(source, opener)
        .with_concurrency(app_config.polling.concurrency)
        .with_request_timeout(Duration::from_secs(
            app_config.polling.request_timeout_seconds,
        ))
        .with_gate(ChangeGate::new(app_config.polling.change_tolerance));

    if once {
        let summary = collector.run_cycle(&subjects).await;
        record_run(paths, &summary);
        print_summary(&summary);
        return Ok(());
    }

    spawn_ctrl_c(cancel.clone());
    let interval = Duration::from_secs(app_config.polling.interval_seconds);
    println!(
        "Collecting {} player(s) every {}s, Ctrl-C to stop",
        subjects.len(),
        interval.as_secs()
    );

    let cycles = collector
        .run_loop(&subjects, interval, cancel, |summary| record_run(paths, summary))
        .await;
    println!("Stopped after {} cycle(s)", cycles);
    Ok(())
}

/// Rewrites the lock every `every` until `cancel` trips, independent of the
/// polling interval. The lock is released when this task drops it.
fn spawn_lock_keeper(
    lock: Arc<RunLock>,
    every: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = lock.refresh() {
                        tracing::warn!("failed to refresh collector lock: {e}");
                    }
                }
            }
        }
    })
}

/// Trips the token on the first Ctrl-C; the running cycle still completes
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("stop requested, finishing current cycle");
                cancel.cancel();
            }
            Err(e) => tracing::warn!("cannot listen for Ctrl-C: {e}"),
        }
    });
}

fn run_record(summary: &BatchSummary) -> RunRecord {
    RunRecord {
        run_id: format!("run-{}", summary.started_at.format("%Y%m%dT%H%M%S%.3fZ")),
        started_at: summary.started_at,
        finished_at: summary.finished_at,
        subjects: summary.subjects(),
        succeeded: summary.succeeded,
        failed: summary.failed,
        unchanged: summary.unchanged,
        no_data: summary.no_data,
        rows_written: summary.rows_written,
        failed_subjects: summary.failed_subjects.clone(),
    }
}

fn record_run(paths: &Paths, summary: &BatchSummary) {
    let record = run_record(summary);
    if let Err(e) = append_jsonl(&paths.runs_file(), &record)
        .with_context(|| format!("writing {}", paths.runs_file().display()))
    {
        tracing::warn!("failed to record run: {e:#}");
    }
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "{} subject(s): {} saved ({} rows), {} unchanged, {} no data, {} failed",
        summary.subjects(),
        summary.succeeded,
        summary.rows_written,
        summary.unchanged,
        summary.no_data,
        summary.failed
    );
    for subject in &summary.failed_subjects {
        println!("  failed: {}", subject);
    }
}
