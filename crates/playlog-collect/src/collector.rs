use chrono::{DateTime, Utc};
use playlog_core::{fingerprint, ChangeGate, OpenStore, PlaytimeItem, SnapshotStore, Subject};
use playlog_source::{SnapshotSource, SourceError, DEFAULT_REQUEST_TIMEOUT};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CONCURRENCY: usize = 4;

/// What happened to one subject during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubjectOutcome {
    Saved { rows: usize },
    /// Fetched fine but within tolerance of the newest stored batch
    Unchanged,
    /// Source unavailable, private or empty this cycle
    NoData,
    /// Storage error; nothing of the batch was kept
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub unchanged: usize,
    pub no_data: usize,
    pub failed: usize,
    pub rows_written: usize,
    pub failed_subjects: Vec<String>,
}

impl BatchSummary {
    fn started(at: DateTime<Utc>) -> Self {
        Self {
            started_at: at,
            finished_at: at,
            succeeded: 0,
            unchanged: 0,
            no_data: 0,
            failed: 0,
            rows_written: 0,
            failed_subjects: Vec::new(),
        }
    }

    pub fn record(&mut self, subject_id: &str, outcome: &SubjectOutcome) {
        match outcome {
            SubjectOutcome::Saved { rows } => {
                self.succeeded += 1;
                self.rows_written += rows;
            }
            SubjectOutcome::Unchanged => self.unchanged += 1,
            SubjectOutcome::NoData => self.no_data += 1,
            SubjectOutcome::Failed(_) => {
                self.failed += 1;
                self.failed_subjects.push(subject_id.to_string());
            }
        }
    }

    pub fn subjects(&self) -> usize {
        self.succeeded + self.unchanged + self.no_data + self.failed
    }
}

/// Fetch, gate and store every subject on a bounded worker pool
pub struct Collector<S, O> {
    source: Arc<S>,
    opener: Arc<O>,
    gate: ChangeGate,
    concurrency: usize,
    request_timeout: Duration,
}

impl<S, O> Collector<S, O>
where
    S: SnapshotSource + Send + Sync + 'static,
    O: OpenStore,
{
    pub fn new(source: S, opener: O) -> Self {
        Self {
            source: Arc::new(source),
            opener: Arc::new(opener),
            gate: ChangeGate::default(),
            concurrency: DEFAULT_CONCURRENCY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_gate(mut self, gate: ChangeGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One polling cycle over all subjects.
    ///
    /// Subjects are independent: a fetch or storage failure is recorded in the
    /// summary and the rest of the batch carries on.
    pub async fn run_cycle(&self, subjects: &[Subject]) -> BatchSummary {
        let mut summary = BatchSummary::started(Utc::now());
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for subject in subjects.iter().cloned() {
            let source = Arc::clone(&self.source);
            let opener = Arc::clone(&self.opener);
            let permits = Arc::clone(&permits);
            let gate = self.gate;
            let timeout = self.request_timeout;

            set.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) => {
                        collect_subject(source.as_ref(), opener, gate, timeout, &subject).await
                    }
                    Err(_) => SubjectOutcome::Failed("worker pool closed".to_string()),
                };
                (subject.subject_id, outcome)
            });
        }

        let mut reported = HashSet::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((subject_id, outcome)) => {
                    summary.record(&subject_id, &outcome);
                    reported.insert(subject_id);
                }
                Err(e) => tracing::warn!("collector task panicked: {e}"),
            }
        }
        // A panicked task never reports its subject; count it as failed by id
        for subject in subjects {
            if reported.insert(subject.subject_id.clone()) {
                summary.record(
                    &subject.subject_id,
                    &SubjectOutcome::Failed("collector task panicked".to_string()),
                );
            }
        }

        summary.finished_at = Utc::now();
        tracing::info!(
            subjects = summary.subjects(),
            saved = summary.succeeded,
            unchanged = summary.unchanged,
            no_data = summary.no_data,
            failed = summary.failed,
            rows = summary.rows_written,
            "collection cycle finished"
        );
        summary
    }

    /// Run cycles every `interval` until `cancel` trips; returns cycles run.
    ///
    /// Cancellation is only observed between cycles, so a running cycle
    /// always completes.
    pub async fn run_loop<F>(
        &self,
        subjects: &[Subject],
        interval: Duration,
        cancel: &CancellationToken,
        mut on_cycle: F,
    ) -> usize
    where
        F: FnMut(&BatchSummary),
    {
        // interval() panics on a zero period
        let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(cycles, "collector loop stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let summary = self.run_cycle(subjects).await;
                    cycles += 1;
                    on_cycle(&summary);
                }
            }
        }
        cycles
    }
}

async fn collect_subject<S, O>(
    source: &S,
    opener: Arc<O>,
    gate: ChangeGate,
    timeout: Duration,
    subject: &Subject,
) -> SubjectOutcome
where
    S: SnapshotSource,
    O: OpenStore,
{
    let fetched = match tokio::time::timeout(timeout, source.fetch_items(subject)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(timeout)),
    };

    let items = match fetched {
        Ok(items) if !items.is_empty() => items,
        Ok(_) => {
            tracing::warn!(subject = %subject.subject_id, "source returned no items");
            return SubjectOutcome::NoData;
        }
        Err(e) => {
            tracing::warn!(subject = %subject.subject_id, error = %e, "no data this cycle");
            return SubjectOutcome::NoData;
        }
    };

    tracing::debug!(
        subject = %subject.subject_id,
        items = items.len(),
        fingerprint = %fingerprint(&items),
        "fetched playtime"
    );

    let subject_id = subject.subject_id.clone();
    let stored =
        tokio::task::spawn_blocking(move || store_if_changed(opener.as_ref(), gate, &subject_id, &items))
            .await;

    match stored {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::warn!(subject = %subject.subject_id, error = %format!("{e:#}"), "storing batch failed");
            SubjectOutcome::Failed(format!("{e:#}"))
        }
        Err(e) => SubjectOutcome::Failed(format!("store task panicked: {e}")),
    }
}

/// Runs on a blocking thread; the store handle lives only for this call
fn store_if_changed<O: OpenStore>(
    opener: &O,
    gate: ChangeGate,
    subject_id: &str,
    items: &[PlaytimeItem],
) -> anyhow::Result<SubjectOutcome> {
    let mut store = opener.open()?;
    let previous = store.latest_batch(subject_id)?;
    if !gate.has_changed(previous.as_deref(), items) {
        tracing::debug!(subject = %subject_id, "batch unchanged, skipping write");
        return Ok(SubjectOutcome::Unchanged);
    }

    let rows = store.append(subject_id, items, None)?;
    tracing::info!(subject = %subject_id, rows, "saved snapshot batch");
    Ok(SubjectOutcome::Saved { rows })
}
