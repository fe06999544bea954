use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use playlog_collect::{
    resolve_subjects, CancellationToken, CollectError, Collector, SubjectOutcome,
};
use playlog_core::{
    ChangeGate, OpenStore, PlayerConfig, PlaytimeItem, Snapshot, SnapshotStore, StoreStats,
    Subject,
};
use playlog_source::{SnapshotSource, SourceError};
use playlog_store::MemoryStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted source: per-subject item lists, failures and an optional delay
#[derive(Default)]
struct FakeSource {
    items: Mutex<HashMap<String, Vec<PlaytimeItem>>>,
    failing: Vec<String>,
    panicking: Vec<String>,
    aliases: HashMap<String, String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    fn set(&self, subject: &str, items: Vec<PlaytimeItem>) {
        self.items
            .lock()
            .unwrap()
            .insert(subject.to_string(), items);
    }
}

impl SnapshotSource for FakeSource {
    async fn fetch_items(&self, subject: &Subject) -> Result<Vec<PlaytimeItem>, SourceError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&subject.subject_id) {
            return Err(SourceError::Private(subject.subject_id.clone()));
        }
        if self.panicking.contains(&subject.subject_id) {
            panic!("scripted panic for {}", subject.subject_id);
        }
        let items = self.items.lock().unwrap().get(&subject.subject_id).cloned();
        Ok(items.unwrap_or_default())
    }

    async fn resolve_alias(&self, alias: &str) -> Result<Option<String>, SourceError> {
        if alias == "offline" {
            return Err(SourceError::Parse("connection reset".to_string()));
        }
        Ok(self.aliases.get(alias).cloned())
    }
}

/// Memory store whose appends fail for one subject
#[derive(Clone)]
struct BrokenFor {
    inner: MemoryStore,
    subject: String,
}

impl SnapshotStore for BrokenFor {
    fn append(
        &mut self,
        subject_id: &str,
        items: &[PlaytimeItem],
        captured_at: Option<DateTime<Utc>>,
    ) -> Result<usize> {
        if subject_id == self.subject {
            return Err(anyhow!("disk I/O error"));
        }
        self.inner.append(subject_id, items, captured_at)
    }

    fn fetch_ordered(&self, subject_id: &str) -> Result<Vec<Snapshot>> {
        self.inner.fetch_ordered(subject_id)
    }

    fn list_subjects(&self) -> Result<Vec<String>> {
        self.inner.list_subjects()
    }

    fn latest_batch(&self, subject_id: &str) -> Result<Option<Vec<PlaytimeItem>>> {
        self.inner.latest_batch(subject_id)
    }

    fn stats(&self) -> Result<StoreStats> {
        self.inner.stats()
    }
}

impl OpenStore for BrokenFor {
    type Store = BrokenFor;

    fn open(&self) -> Result<BrokenFor> {
        Ok(self.clone())
    }
}

fn item(id: i64, minutes: u64) -> PlaytimeItem {
    PlaytimeItem::new(id, Some("Game"), minutes)
}

fn subjects(ids: &[&str]) -> Vec<Subject> {
    ids.iter().map(|id| Subject::new(*id)).collect()
}

#[tokio::test]
async fn one_failing_subject_does_not_abort_the_batch() {
    let source = FakeSource {
        failing: vec!["private".to_string()],
        ..Default::default()
    };
    source.set("a", vec![item(1, 10), item(2, 20)]);
    source.set("b", vec![item(1, 5)]);
    source.set("broken", vec![item(1, 5)]);

    let store = MemoryStore::new();
    let opener = BrokenFor {
        inner: store.clone(),
        subject: "broken".to_string(),
    };
    let collector = Collector::new(source, opener).with_concurrency(2);

    let summary = collector
        .run_cycle(&subjects(&["a", "b", "private", "empty", "broken"]))
        .await;

    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.no_data, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_subjects, vec!["broken".to_string()]);
    assert_eq!(
        store.list_subjects().unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}

#[tokio::test]
async fn panicked_subject_is_listed_as_failed() {
    let source = FakeSource {
        panicking: vec!["crashy".to_string()],
        ..Default::default()
    };
    source.set("a", vec![item(1, 10)]);
    let store = MemoryStore::new();
    let collector = Collector::new(source, store.clone());

    let summary = collector.run_cycle(&subjects(&["a", "crashy"])).await;

    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.failed_subjects, vec!["crashy".to_string()]);
    assert_eq!(summary.subjects(), 2);
}

#[tokio::test]
async fn unchanged_batches_are_not_written_again() {
    let source = FakeSource::default();
    source.set("a", vec![item(1, 10)]);
    let store = MemoryStore::new();
    let collector = Collector::new(source, store.clone()).with_gate(ChangeGate::default());
    let who = subjects(&["a"]);

    let first = collector.run_cycle(&who).await;
    let second = collector.run_cycle(&who).await;
    assert_eq!(first.succeeded, 1);
    assert_eq!(second.unchanged, 1);
    assert_eq!(store.len(), 1);

    collector.source().set("a", vec![item(1, 25)]);
    let third = collector.run_cycle(&who).await;
    assert_eq!(third.succeeded, 1);

    let sessions = playlog_core::sessions_for_subject(&store, "a", None).unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].value_delta, 15);
}

#[tokio::test]
async fn slow_fetch_counts_as_no_data() {
    let source = FakeSource {
        delay: Duration::from_millis(300),
        ..Default::default()
    };
    source.set("a", vec![item(1, 10)]);
    let store = MemoryStore::new();
    let collector =
        Collector::new(source, store.clone()).with_request_timeout(Duration::from_millis(20));

    let summary = collector.run_cycle(&subjects(&["a"])).await;
    assert_eq!(summary.no_data, 1);
    assert!(store.is_empty());
}

#[tokio::test]
async fn worker_pool_is_bounded() {
    let source = FakeSource {
        delay: Duration::from_millis(20),
        ..Default::default()
    };
    let ids = ["a", "b", "c", "d", "e", "f"];
    for id in ids {
        source.set(id, vec![item(1, 1)]);
    }
    let collector = Collector::new(source, MemoryStore::new()).with_concurrency(2);

    let summary = collector.run_cycle(&subjects(&ids)).await;
    assert_eq!(summary.succeeded, 6);
    assert!(collector.source().max_in_flight.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn cancelled_before_start_runs_no_cycle() {
    let source = FakeSource::default();
    source.set("a", vec![item(1, 1)]);
    let store = MemoryStore::new();
    let collector = Collector::new(source, store.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let cycles = collector
        .run_loop(&subjects(&["a"]), Duration::from_millis(5), &cancel, |_| {})
        .await;
    assert_eq!(cycles, 0);
    assert!(store.is_empty());
}

#[tokio::test]
async fn cancel_during_cycle_lets_it_finish() {
    let source = FakeSource::default();
    source.set("a", vec![item(1, 1)]);
    let store = MemoryStore::new();
    let collector = Collector::new(source, store.clone());
    let cancel = CancellationToken::new();
    let seen = Arc::new(AtomicUsize::new(0));

    let cycles = {
        let seen = Arc::clone(&seen);
        let cancel_from_callback = cancel.clone();
        collector
            .run_loop(&subjects(&["a"]), Duration::from_millis(5), &cancel, move |summary| {
                seen.fetch_add(summary.succeeded, Ordering::SeqCst);
                cancel_from_callback.cancel();
            })
            .await
    };

    assert_eq!(cycles, 1);
    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn aliases_resolve_before_collection() {
    let source = FakeSource {
        aliases: HashMap::from([("rook".to_string(), "76561197960287930".to_string())]),
        ..Default::default()
    };
    let players = vec![
        PlayerConfig {
            steamid: None,
            vanity_url: Some("rook".to_string()),
        },
        PlayerConfig {
            steamid: Some("76561197960287930".to_string()),
            vanity_url: None,
        },
        PlayerConfig {
            steamid: Some("76561198000000042".to_string()),
            vanity_url: Some("other".to_string()),
        },
    ];

    let resolved = resolve_subjects(&source, &players).await.unwrap();
    assert_eq!(
        resolved,
        vec![
            Subject::with_alias("76561197960287930", "rook"),
            Subject::with_alias("76561198000000042", "other"),
        ]
    );
}

#[tokio::test]
async fn unknown_alias_is_fatal() {
    let source = FakeSource::default();
    let unknown = vec![PlayerConfig {
        steamid: None,
        vanity_url: Some("nobody".to_string()),
    }];
    let err = resolve_subjects(&source, &unknown).await.unwrap_err();
    assert!(matches!(err, CollectError::UnresolvedAlias { ref alias, source: None } if alias == "nobody"));

    let offline = vec![PlayerConfig {
        steamid: None,
        vanity_url: Some("offline".to_string()),
    }];
    let err = resolve_subjects(&source, &offline).await.unwrap_err();
    assert!(matches!(err, CollectError::UnresolvedAlias { source: Some(_), .. }));

    let err = resolve_subjects(&source, &[]).await.unwrap_err();
    assert!(matches!(err, CollectError::NoSubjects));
}
