use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use tokio::sync::{broadcast, Notify};

use viral_monitor::backoff::BackoffPolicy;
use viral_monitor::config::MonitorConfig;
use viral_monitor::history::RunHistoryStore;
use viral_monitor::persona::ReplyStyle;
use viral_monitor::report::{Report, RunSummary, REPLY_FAILURE_SENTINEL};
use viral_monitor::runner::{
    run_id, Monitor, PostSource, ReplyGenerator, ReportSink, RunHeader, RunOptions, RunOutcome,
};
use viral_monitor::scoring::{Category, CategoryBatch};
use viral_monitor::status::{MemoryStatusStore, MonitorStatus};
use viral_monitor::{Author, EngagementFormula, MonitorError, Post, PostMetrics, Result};

struct FakeSource {
    batches: Vec<CategoryBatch>,
    calls: AtomicUsize,
}

impl FakeSource {
    fn new(batches: Vec<CategoryBatch>) -> Arc<Self> {
        Arc::new(Self {
            batches,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostSource for FakeSource {
    fn label(&self) -> &'static str {
        "x"
    }

    async fn fetch_category_posts(&self, _categories: &[Category], _per_category: usize) -> Vec<CategoryBatch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batches.clone()
    }
}

/// Holds every fetch until released, counting how many are in flight.
#[derive(Default)]
struct GatedSource {
    entered: Notify,
    release: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl PostSource for GatedSource {
    fn label(&self) -> &'static str {
        "x"
    }

    async fn fetch_category_posts(&self, _categories: &[Category], _per_category: usize) -> Vec<CategoryBatch> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        viral_batches()
    }
}

struct FakeReplies {
    fail: bool,
}

#[async_trait]
impl ReplyGenerator for FakeReplies {
    async fn generate_replies(&self, post: &Post, _style: ReplyStyle) -> Vec<String> {
        if self.fail {
            return vec![REPLY_FAILURE_SENTINEL.to_string()];
        }
        (1..=4).map(|i| format!("reply {} to {}", i, post.id)).collect()
    }
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<String>>,
    fail_reports: bool,
}

impl RecordingSink {
    fn failing() -> Self {
        Self {
            fail_reports: true,
            ..Self::default()
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn post_header(&self, header: &RunHeader) -> Result<()> {
        self.record(format!("header {} {}", header.source, header.local_time()));
        Ok(())
    }

    async fn post_report(&self, report: &Report) -> Result<()> {
        if self.fail_reports {
            return Err(MonitorError::Transport("channel unavailable".to_string()));
        }
        self.record(format!("report {} {}", report.category, report.post.id));
        Ok(())
    }

    async fn post_no_posts(&self) -> Result<()> {
        self.record("no_posts".to_string());
        Ok(())
    }

    async fn post_footer(&self, summary: &RunSummary) -> Result<()> {
        self.record(format!("footer {}", summary.run_id));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.record("close".to_string());
        Ok(())
    }
}

fn post(id: &str, likes: u64, reposts: u64) -> Post {
    Post::new(
        id,
        format!("post {}", id),
        format!("https://twitter.com/user/status/{}", id),
        Some(Author::new("user").with_followers(5_000)),
        PostMetrics {
            likes,
            reposts,
            ..PostMetrics::default()
        },
        None,
        EngagementFormula::Reposts,
    )
}

fn viral_batches() -> Vec<CategoryBatch> {
    vec![
        CategoryBatch::new("tech", vec![post("t1", 60, 10), post("t2", 3, 0)]),
        CategoryBatch::new("crypto", vec![post("c1", 75, 10)]),
        CategoryBatch::empty("ai"),
    ]
}

fn config() -> MonitorConfig {
    MonitorConfig {
        backoff: BackoffPolicy::immediate(),
        ..MonitorConfig::default()
    }
}

fn at_hour(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 2, hour, 0, 0).unwrap()
}

fn monitor(status: MonitorStatus, source: Arc<FakeSource>, fail_replies: bool) -> Monitor {
    Monitor::new(
        &config(),
        Arc::new(MemoryStatusStore::new(status)),
        source,
        Arc::new(FakeReplies { fail: fail_replies }),
    )
    .unwrap()
}

fn scheduled(hour: u32) -> RunOptions {
    RunOptions {
        force: false,
        now: at_hour(hour),
    }
}

#[tokio::test]
async fn disabled_monitor_skips_without_fetching() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Disabled, Arc::clone(&source), false);
    let sink = RecordingSink::default();

    let outcome = monitor.run_once(&sink, scheduled(1)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Disabled));
    assert_eq!(source.calls(), 0);
    assert!(sink.calls().is_empty());
}

#[tokio::test]
async fn outside_active_hours_skips() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, Arc::clone(&source), false);
    let sink = RecordingSink::default();

    let outcome = monitor.run_once(&sink, scheduled(12)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::OutsideActiveHours { utc_hour: 12 }));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn reports_posts_in_score_order() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, Arc::clone(&source), false);
    let sink = RecordingSink::default();

    let outcome = monitor.run_once(&sink, scheduled(1)).await.unwrap();

    let summary = match outcome {
        RunOutcome::Reported(summary) => summary,
        other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(summary.run_id, "run-20260102T010000000Z");
    assert_eq!(summary.source, "x");
    assert_eq!(summary.fetched_total(), 3);
    assert_eq!(summary.passed_total(), 2);
    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.reports[0].post.engagement_score(), 95);
    assert_eq!(summary.reports[0].replies.len(), 3);
    assert_eq!(summary.reports[1].category, "tech");

    assert_eq!(
        sink.calls(),
        vec![
            "header x 08:00",
            "report crypto c1",
            "report tech t1",
            "footer run-20260102T010000000Z",
            "close",
        ]
    );
}

#[tokio::test]
async fn force_bypasses_flag_and_schedule() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Disabled, Arc::clone(&source), false);
    let sink = RecordingSink::default();
    let options = RunOptions {
        force: true,
        now: at_hour(15),
    };

    let outcome = monitor.run_once(&sink, options).await.unwrap();

    assert!(matches!(outcome, RunOutcome::Reported(_)));
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn nothing_qualifying_posts_notice() {
    let source = FakeSource::new(vec![CategoryBatch::new("tech", vec![post("t1", 2, 0)])]);
    let monitor = monitor(MonitorStatus::Enabled, source, false);
    let sink = RecordingSink::default();

    let outcome = monitor.run_once(&sink, scheduled(2)).await.unwrap();

    assert!(matches!(outcome, RunOutcome::NoQualifyingPosts));
    assert_eq!(sink.calls(), vec!["header x 09:00", "no_posts", "close"]);
}

#[tokio::test]
async fn failed_reply_generation_still_reports() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, source, true);
    let sink = RecordingSink::default();

    let outcome = monitor.run_once(&sink, scheduled(0)).await.unwrap();

    match outcome {
        RunOutcome::Reported(summary) => {
            assert!(summary.reports.iter().all(|report| report.replies_failed()));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn transport_failure_still_closes_sink() {
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, source, false);
    let sink = RecordingSink::failing();

    let err = monitor.run_once(&sink, scheduled(1)).await.unwrap_err();

    assert!(matches!(err, MonitorError::Transport(_)));
    assert_eq!(sink.calls(), vec!["header x 08:00", "close"]);
}

#[tokio::test]
async fn run_events_are_broadcast() {
    let (sender, mut receiver) = broadcast::channel(32);
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, source, false).with_events(sender);
    let sink = RecordingSink::default();

    monitor.run_once(&sink, scheduled(1)).await.unwrap();

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event.event);
    }
    assert_eq!(events.first().map(String::as_str), Some("fetching"));
    assert_eq!(events.last().map(String::as_str), Some("done"));
    assert!(events.iter().any(|event| event == "generating"));
}

#[tokio::test]
async fn history_keeps_newest_runs_within_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("data").join("history.json");
    let store = RunHistoryStore::load(path.clone(), 2).await.unwrap();
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, source, false);

    for hour in 0..3 {
        let sink = RecordingSink::default();
        if let RunOutcome::Reported(summary) = monitor.run_once(&sink, scheduled(hour)).await.unwrap() {
            store.add(summary).await.unwrap();
        }
    }

    let ids: Vec<String> = store.list().await.into_iter().map(|run| run.run_id).collect();
    assert_eq!(ids, vec!["run-20260102T020000000Z", "run-20260102T010000000Z"]);

    let reloaded = RunHistoryStore::load(path, 2).await.unwrap();
    assert!(reloaded.get("run-20260102T020000000Z").await.is_some());
    assert!(reloaded.get("run-20260102T000000000Z").await.is_none());
}

#[tokio::test]
async fn overlapping_runs_are_refused() {
    let source = Arc::new(GatedSource::default());
    let monitor = Arc::new(
        Monitor::new(
            &config(),
            Arc::new(MemoryStatusStore::new(MonitorStatus::Enabled)),
            Arc::clone(&source) as Arc<dyn PostSource>,
            Arc::new(FakeReplies { fail: false }),
        )
        .unwrap(),
    );

    let first = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move {
            let sink = RecordingSink::default();
            monitor.run_once(&sink, RunOptions::forced()).await
        })
    };
    source.entered.notified().await;

    let sink = RecordingSink::default();
    let err = monitor.run_once(&sink, RunOptions::forced()).await.unwrap_err();
    assert!(matches!(err, MonitorError::RunInProgress));
    assert!(sink.calls().is_empty());

    source.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert!(matches!(outcome, RunOutcome::Reported(_)));
    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);

    source.release.notify_one();
    let sink = RecordingSink::default();
    assert!(monitor.run_once(&sink, RunOptions::forced()).await.is_ok());
}

#[tokio::test]
async fn runs_in_the_same_second_get_distinct_ids() {
    let dir = tempdir().unwrap();
    let store = RunHistoryStore::load(dir.path().join("history.json"), 10).await.unwrap();
    let source = FakeSource::new(viral_batches());
    let monitor = monitor(MonitorStatus::Enabled, source, false);
    let first_at = at_hour(1);
    let second_at = first_at + chrono::Duration::milliseconds(250);

    for now in [first_at, second_at] {
        let sink = RecordingSink::default();
        let options = RunOptions { force: false, now };
        if let RunOutcome::Reported(summary) = monitor.run_once(&sink, options).await.unwrap() {
            store.add(summary).await.unwrap();
        }
    }

    assert_eq!(run_id(second_at), "run-20260102T010000250Z");
    assert_eq!(store.list().await.len(), 2);
    assert!(store.get(&run_id(first_at)).await.is_some());
    assert!(store.get(&run_id(second_at)).await.is_some());
}
