use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::storage::{read_json, write_json};
use crate::{truncate_text, PostMetrics, Result};

const REPORT_WINDOW_DAYS: i64 = 7;
const TOP_REPLIES: usize = 3;
const MIN_REPLIES_FOR_INSIGHTS: usize = 5;

/// Looks up current public metrics for one of the account's own posts.
#[async_trait]
pub trait PostMetricsLookup: Send + Sync {
    async fn post_metrics(&self, post_id: &str) -> Result<PostMetrics>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedReply {
    pub id: String,
    pub original_url: String,
    pub text: String,
    pub category: String,
    pub posted_at: DateTime<Utc>,
    /// Filled by the first successful engagement check.
    pub metrics: Option<PostMetrics>,
    pub checked_at: Option<DateTime<Utc>>,
}

impl LoggedReply {
    pub fn new(
        id: impl Into<String>,
        original_url: impl Into<String>,
        text: impl Into<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            original_url: original_url.into(),
            text: text.into(),
            category: "viral".to_string(),
            posted_at,
            metrics: None,
            checked_at: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    fn likes(&self) -> u64 {
        self.metrics.as_ref().map(|metrics| metrics.likes).unwrap_or(0)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ReplyFile {
    replies: Vec<LoggedReply>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckSummary {
    pub checked: usize,
    pub failed: usize,
}

/// Like thresholds separating winning replies from misses.
#[derive(Debug, Clone, Copy)]
pub struct ReplyThresholds {
    pub high_likes: u64,
    pub low_likes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopReply {
    pub text: String,
    pub likes: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyInsights {
    pub pattern: String,
    pub high_performers: usize,
    pub tip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplyReport {
    pub period_days: i64,
    pub total_replies: usize,
    pub total_likes: u64,
    pub avg_likes: u64,
    pub top: Vec<TopReply>,
    /// Absent until enough checked replies exist.
    pub insights: Option<ReplyInsights>,
}

impl ReplyReport {
    pub fn is_empty(&self) -> bool {
        self.total_replies == 0
    }
}

/// Replies posted from the account, checked for engagement later.
pub struct ReplyLog {
    path: PathBuf,
    data: Mutex<ReplyFile>,
}

impl ReplyLog {
    pub async fn load(path: PathBuf) -> Result<Self> {
        let data = read_json(&path, "reply log").await?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Returns false when a reply with the same id is already logged.
    pub async fn log(&self, reply: LoggedReply) -> Result<bool> {
        let mut guard = self.data.lock().await;
        if guard.replies.iter().any(|existing| existing.id == reply.id) {
            tracing::info!(reply_id = %reply.id, "reply already logged");
            return Ok(false);
        }
        tracing::info!(reply_id = %reply.id, category = %reply.category, "reply logged");
        guard.replies.push(reply);
        write_json(&self.path, &*guard, "reply log").await?;
        Ok(true)
    }

    pub async fn replies(&self) -> Vec<LoggedReply> {
        self.data.lock().await.replies.clone()
    }

    /// Fetches metrics for every reply not yet checked. A failed lookup leaves
    /// the reply unchecked for the next pass.
    pub async fn check_engagement(
        &self,
        lookup: &dyn PostMetricsLookup,
        now: DateTime<Utc>,
        delay: std::time::Duration,
    ) -> Result<CheckSummary> {
        let mut guard = self.data.lock().await;
        let mut summary = CheckSummary::default();
        let pending = guard.replies.iter().filter(|reply| reply.checked_at.is_none()).count();
        if pending == 0 {
            return Ok(summary);
        }
        tracing::info!(pending, "checking reply engagement");

        for reply in guard.replies.iter_mut().filter(|reply| reply.checked_at.is_none()) {
            match lookup.post_metrics(&reply.id).await {
                Ok(metrics) => {
                    reply.metrics = Some(metrics);
                    reply.checked_at = Some(now);
                    summary.checked += 1;
                }
                Err(err) => {
                    tracing::warn!(reply_id = %reply.id, error = %err, "engagement check failed");
                    summary.failed += 1;
                }
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        write_json(&self.path, &*guard, "reply log").await?;
        Ok(summary)
    }

    /// Checked replies posted in the last seven days, best first.
    pub async fn report(&self, now: DateTime<Utc>, account: &str, thresholds: ReplyThresholds) -> ReplyReport {
        let guard = self.data.lock().await;
        let since = now - Duration::days(REPORT_WINDOW_DAYS);
        let mut recent: Vec<&LoggedReply> = guard
            .replies
            .iter()
            .filter(|reply| reply.posted_at >= since && reply.metrics.is_some())
            .collect();
        recent.sort_by(|a, b| b.likes().cmp(&a.likes()));

        let total_likes: u64 = recent.iter().map(|reply| reply.likes()).sum();
        let avg_likes = if recent.is_empty() {
            0
        } else {
            (total_likes as f64 / recent.len() as f64).round() as u64
        };

        ReplyReport {
            period_days: REPORT_WINDOW_DAYS,
            total_replies: recent.len(),
            total_likes,
            avg_likes,
            top: recent
                .iter()
                .take(TOP_REPLIES)
                .map(|reply| TopReply {
                    text: truncate_text(&reply.text, 80),
                    likes: reply.likes(),
                    url: format!("https://twitter.com/{}/status/{}", account, reply.id),
                })
                .collect(),
            insights: insights(&recent, thresholds),
        }
    }
}

fn insights(replies: &[&LoggedReply], thresholds: ReplyThresholds) -> Option<ReplyInsights> {
    if replies.len() < MIN_REPLIES_FOR_INSIGHTS {
        return None;
    }
    let high: Vec<&LoggedReply> = replies
        .iter()
        .copied()
        .filter(|reply| reply.likes() >= thresholds.high_likes)
        .collect();
    let low: Vec<&LoggedReply> = replies
        .iter()
        .copied()
        .filter(|reply| reply.likes() < thresholds.low_likes)
        .collect();

    let pattern = match (mean_length(&high), mean_length(&low)) {
        (Some(high_len), Some(low_len)) if high_len < low_len => "Shorter replies perform better",
        (Some(_), Some(_)) => "Longer replies perform better",
        _ => "Not enough contrast between winners and misses yet",
    };
    let tip = if high.is_empty() {
        "Keep posting to build pattern data"
    } else {
        "Winning replies are typically under 100 chars with punchy takes"
    };

    Some(ReplyInsights {
        pattern: pattern.to_string(),
        high_performers: high.len(),
        tip: tip.to_string(),
    })
}

fn mean_length(replies: &[&LoggedReply]) -> Option<f64> {
    if replies.is_empty() {
        return None;
    }
    let total: usize = replies.iter().map(|reply| reply.text.chars().count()).sum();
    Some(total as f64 / replies.len() as f64)
}
