pub mod analytics;
pub mod backoff;
pub mod config;
pub mod error;
pub mod growth;
pub mod history;
pub mod persona;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod status;
mod storage;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::{MonitorError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub username: String,
    pub name: Option<String>,
    pub followers: Option<u64>,
    pub verified: bool,
}

impl Author {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            name: None,
            followers: None,
            verified: false,
        }
    }

    pub fn with_followers(mut self, followers: u64) -> Self {
        self.followers = Some(followers);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub reposts: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub quotes: u64,
    #[serde(default)]
    pub impressions: u64,
}

/// How a source's raw counters collapse into one ranking number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementFormula {
    /// likes + 2 * reposts
    Reposts,
    /// score + 5 * comments, with the score carried in `likes` and comments in `replies`
    Upvotes,
}

impl EngagementFormula {
    pub fn score(self, metrics: &PostMetrics) -> u64 {
        match self {
            EngagementFormula::Reposts => metrics.likes.saturating_add(metrics.reposts.saturating_mul(2)),
            EngagementFormula::Upvotes => metrics.likes.saturating_add(metrics.replies.saturating_mul(5)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryConflict {
    pub existing: String,
    pub requested: String,
}

/// One fetched post. The engagement score is fixed when the post is built and
/// the category can be set once. Deserializing recomputes the score from the
/// stored metrics; a stored score is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostRecord")]
pub struct Post {
    pub id: String,
    pub text: String,
    pub url: String,
    pub author: Option<Author>,
    pub metrics: PostMetrics,
    pub created_at: Option<DateTime<Utc>>,
    formula: EngagementFormula,
    engagement_score: u64,
    category: Option<String>,
}

impl Post {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        url: impl Into<String>,
        author: Option<Author>,
        metrics: PostMetrics,
        created_at: Option<DateTime<Utc>>,
        formula: EngagementFormula,
    ) -> Self {
        let engagement_score = formula.score(&metrics);
        Self {
            id: id.into(),
            text: text.into(),
            url: url.into(),
            author,
            metrics,
            created_at,
            formula,
            engagement_score,
            category: None,
        }
    }

    /// Fetch-scoped constructor helper: tags the post with the category its query targeted.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn engagement_score(&self) -> u64 {
        self.engagement_score
    }

    pub fn formula(&self) -> EngagementFormula {
        self.formula
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Likes for reposted sources, score for upvoted ones.
    pub fn primary_engagement(&self) -> u64 {
        self.metrics.likes
    }

    pub fn author_followers(&self) -> Option<u64> {
        self.author.as_ref().and_then(|author| author.followers)
    }

    pub fn author_handle(&self) -> &str {
        self.author
            .as_ref()
            .map(|author| author.username.as_str())
            .unwrap_or("unknown")
    }

    pub fn assign_category(&mut self, name: &str) -> std::result::Result<(), CategoryConflict> {
        match self.category.as_deref() {
            Some(existing) if existing != name => Err(CategoryConflict {
                existing: existing.to_string(),
                requested: name.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.category = Some(name.to_string());
                Ok(())
            }
        }
    }
}

#[derive(Deserialize)]
struct PostRecord {
    id: String,
    text: String,
    url: String,
    author: Option<Author>,
    metrics: PostMetrics,
    created_at: Option<DateTime<Utc>>,
    formula: EngagementFormula,
    category: Option<String>,
}

impl From<PostRecord> for Post {
    fn from(record: PostRecord) -> Self {
        let post = Post::new(
            record.id,
            record.text,
            record.url,
            record.author,
            record.metrics,
            record.created_at,
            record.formula,
        );
        match record.category {
            Some(category) => post.with_category(category),
            None => post,
        }
    }
}

pub fn format_number(value: u64) -> String {
    let mut chars: Vec<char> = value.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}

/// Cuts `text` to at most `max_chars` characters, appending an ellipsis when shortened.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}
