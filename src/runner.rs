//! One monitor run: status check, fetch, rank, reply suggestions, report.
//!
//! Network collaborators sit behind the traits below so the pipeline can be
//! driven by real clients from the binary or by fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, Mutex};

use crate::backoff::BackoffPolicy;
use crate::config::{MonitorConfig, ScheduleConfig};
use crate::persona::ReplyStyle;
use crate::report::{Report, RunSummary};
use crate::scoring::{
    Category, CategoryBatch, CategoryCatalog, CategorySelector, QualityFilter, SelectionOutcome,
};
use crate::status::StatusStore;
use crate::{MonitorError, Post, Result};

/// Fetches posts per category. A category whose fetch fails yields an empty
/// batch; the failure is logged by the implementation.
#[async_trait]
pub trait PostSource: Send + Sync {
    fn label(&self) -> &'static str;

    async fn fetch_category_posts(&self, categories: &[Category], per_category: usize) -> Vec<CategoryBatch>;
}

/// Produces up to three reply suggestions. On failure returns a single
/// [`crate::report::REPLY_FAILURE_SENTINEL`] entry instead of an error.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_replies(&self, post: &Post, style: ReplyStyle) -> Vec<String>;
}

#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn post_header(&self, header: &RunHeader) -> Result<()>;
    async fn post_report(&self, report: &Report) -> Result<()>;
    async fn post_no_posts(&self) -> Result<()>;
    async fn post_footer(&self, summary: &RunSummary) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RunHeader {
    pub source: String,
    pub utc_hour: u8,
    pub local_hour: u8,
    pub zone: String,
}

impl RunHeader {
    pub fn local_time(&self) -> String {
        format!("{:02}:00", self.local_hour)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Skip the enable flag and the active-hours window.
    pub force: bool,
    pub now: DateTime<Utc>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            now: Utc::now(),
        }
    }
}

impl RunOptions {
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Disabled,
    OutsideActiveHours { utc_hour: u8 },
    NoQualifyingPosts,
    Reported(RunSummary),
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::Disabled => "disabled",
            RunOutcome::OutsideActiveHours { .. } => "outside_active_hours",
            RunOutcome::NoQualifyingPosts => "no_qualifying_posts",
            RunOutcome::Reported(_) => "reported",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub event: String,
    pub message: String,
    pub timestamp_ms: u128,
}

pub struct Monitor {
    status: Arc<dyn StatusStore>,
    source: Arc<dyn PostSource>,
    replies: Arc<dyn ReplyGenerator>,
    selector: CategorySelector,
    categories: Vec<Category>,
    per_category: usize,
    style: ReplyStyle,
    schedule: ScheduleConfig,
    backoff: BackoffPolicy,
    events: Option<broadcast::Sender<RunEvent>>,
    run_lock: Mutex<()>,
}

impl Monitor {
    pub fn new(
        config: &MonitorConfig,
        status: Arc<dyn StatusStore>,
        source: Arc<dyn PostSource>,
        replies: Arc<dyn ReplyGenerator>,
    ) -> Result<Self> {
        let filter = QualityFilter::new(config.filter.clone())?;
        let per_category = match config.source {
            crate::config::SourceKind::X => config.x.posts_per_category,
            crate::config::SourceKind::Reddit => config.reddit.posts_per_category,
        };
        Ok(Self {
            status,
            source,
            replies,
            selector: CategorySelector::new(filter, config.selection.clone())
                .with_catalog(CategoryCatalog::new(config.categories.clone())),
            categories: config.categories.clone(),
            per_category,
            style: config.replies.reply_style(),
            schedule: config.schedule.clone(),
            backoff: config.backoff.clone(),
            events: None,
            run_lock: Mutex::new(()),
        })
    }

    pub fn with_events(mut self, sender: broadcast::Sender<RunEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn status_store(&self) -> Arc<dyn StatusStore> {
        Arc::clone(&self.status)
    }

    /// Runs the pipeline once. Whatever happens after the header is posted,
    /// the sink is closed before returning.
    ///
    /// Runs on one monitor never overlap: a call made while another is in
    /// flight fails with [`MonitorError::RunInProgress`] without touching the sink.
    pub async fn run_once(&self, sink: &dyn ReportSink, options: RunOptions) -> Result<RunOutcome> {
        let _running = self.run_lock.try_lock().map_err(|_| {
            tracing::warn!("run requested while another run is in progress");
            MonitorError::RunInProgress
        })?;

        if !options.force {
            let status = self.status.get()?;
            if !status.is_enabled() {
                tracing::info!(status = %status, "monitor is not enabled, skipping run");
                self.emit("skipped", "Monitor is disabled");
                return Ok(RunOutcome::Disabled);
            }
        }

        let utc_hour = options.now.hour() as u8;
        if !options.force && !self.schedule.is_active(utc_hour) {
            tracing::info!(utc_hour, "outside active hours, skipping run");
            self.emit("skipped", "Outside active hours");
            return Ok(RunOutcome::OutsideActiveHours { utc_hour });
        }

        let result = self.report(sink, options.now, utc_hour).await;
        let closed = sink.close().await;

        match (result, closed) {
            (Err(err), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "failed to close report sink");
                }
                self.emit("error", &err.to_string());
                Err(err)
            }
            (Ok(_), Err(close_err)) => {
                self.emit("error", &close_err.to_string());
                Err(close_err)
            }
            (Ok(outcome), Ok(())) => {
                self.emit("done", outcome.label());
                Ok(outcome)
            }
        }
    }

    async fn report(&self, sink: &dyn ReportSink, now: DateTime<Utc>, utc_hour: u8) -> Result<RunOutcome> {
        let header = RunHeader {
            source: self.source.label().to_string(),
            utc_hour,
            local_hour: self.schedule.local_hour(utc_hour),
            zone: self.schedule.display_zone.clone(),
        };
        sink.post_header(&header).await?;

        self.emit("fetching", "Fetching posts");
        let batches = self
            .source
            .fetch_category_posts(&self.categories, self.per_category)
            .await;
        for batch in &batches {
            tracing::info!(category = %batch.category, fetched = batch.posts.len(), "posts fetched");
        }

        self.emit("ranking", "Filtering and ranking posts");
        let (outcome, category_stats) = self.selector.select_with_stats(batches);
        for stats in &category_stats {
            tracing::info!(
                category = %stats.category,
                passed = stats.passed,
                selected = stats.selected,
                "quality filter applied"
            );
        }

        let selected = match outcome {
            SelectionOutcome::NoQualifyingPosts => {
                tracing::info!("no qualifying posts this run");
                sink.post_no_posts().await?;
                return Ok(RunOutcome::NoQualifyingPosts);
            }
            SelectionOutcome::Selected(posts) => posts,
        };

        tracing::info!(count = selected.len(), style = self.style.label(), "generating reply suggestions");
        let delay = self.backoff.post_delay();
        let total = selected.len();
        let mut reports = Vec::with_capacity(total);

        for (index, post) in selected.into_iter().enumerate() {
            self.emit(
                "generating",
                &format!("Generating replies for @{} ({}/{})", post.author_handle(), index + 1, total),
            );
            let replies = self.replies.generate_replies(&post, self.style).await;
            let report = Report::assemble(post, replies);
            tracing::info!(
                post_id = %report.post.id,
                category = %report.category,
                score = report.post.engagement_score(),
                replies = report.replies.len(),
                "posting report"
            );
            sink.post_report(&report).await?;
            reports.push(report);

            if index + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let summary = RunSummary {
            run_id: run_id(now),
            started_at: now,
            source: header.source,
            reports,
            category_stats,
        };
        sink.post_footer(&summary).await?;
        Ok(RunOutcome::Reported(summary))
    }

    fn emit(&self, event: &str, message: &str) {
        if let Some(sender) = self.events.as_ref() {
            let _ = sender.send(RunEvent {
                event: event.to_string(),
                message: message.to_string(),
                timestamp_ms: now_ms(),
            });
        }
    }
}

/// Millisecond resolution; runs are serialized per monitor.
pub fn run_id(started_at: DateTime<Utc>) -> String {
    format!("run-{}", started_at.format("%Y%m%dT%H%M%S%3fZ"))
}

pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}
