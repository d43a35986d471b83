use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scoring::{CategoryStats, GENERAL_CATEGORY};
use crate::Post;

/// Placeholder reply used when suggestion generation fails upstream.
pub const REPLY_FAILURE_SENTINEL: &str = "Error generating reply suggestions";

pub const MAX_REPLIES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub category: String,
    pub post: Post,
    pub replies: Vec<String>,
}

impl Report {
    pub fn assemble(post: Post, replies: Vec<String>) -> Self {
        let category = post.category().unwrap_or(GENERAL_CATEGORY).to_string();
        let replies = replies
            .into_iter()
            .map(|reply| reply.trim().to_string())
            .filter(|reply| !reply.is_empty())
            .take(MAX_REPLIES)
            .collect();
        Self {
            category,
            post,
            replies,
        }
    }

    pub fn replies_failed(&self) -> bool {
        self.replies.len() == 1 && self.replies[0] == REPLY_FAILURE_SENTINEL
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub source: String,
    pub reports: Vec<Report>,
    pub category_stats: Vec<CategoryStats>,
}

impl RunSummary {
    pub fn fetched_total(&self) -> usize {
        self.category_stats.iter().map(|stats| stats.fetched).sum()
    }

    pub fn passed_total(&self) -> usize {
        self.category_stats.iter().map(|stats| stats.passed).sum()
    }
}
