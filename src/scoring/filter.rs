use regex::RegexSet;
use serde::{Deserialize, Serialize};

use crate::{MonitorError, Post, Result};

pub const DEFAULT_SPAM_PATTERNS: &[&str] = &[
    r"giv(ing|e)\s*(away|out)",
    r"free\s*(airdrop|drop|mint|nft|crypto|btc|eth)",
    r"airdrop",
    r"send\s*\d",
    r"dm\s*(me|to)\s*(claim|get|receive)",
    r"claim\s*(your|free|now)",
    r"whitelist\s*spot",
    r"follow\s*\+\s*(rt|retweet|like)",
    r"rt\s*\+\s*follow",
    r"retweet\s*(and|&|\+)\s*follow",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFilterConfig {
    pub min_engagement: u64,
    pub min_followers: u64,
    pub enforce_spam_patterns: bool,
    pub max_urls: usize,
    /// Replaces the built-in spam set when present.
    pub spam_patterns: Option<Vec<String>>,
}

impl Default for QualityFilterConfig {
    fn default() -> Self {
        Self {
            min_engagement: 10,
            min_followers: 100,
            enforce_spam_patterns: true,
            max_urls: 1,
            spam_patterns: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpamPatterns {
    set: RegexSet,
}

impl SpamPatterns {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|pattern| format!("(?i){}", pattern.as_ref()))
            .collect();
        let set = RegexSet::new(&patterns)
            .map_err(|err| MonitorError::Config(format!("invalid spam pattern: {}", err)))?;
        Ok(Self { set })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl Default for SpamPatterns {
    fn default() -> Self {
        let patterns: Vec<String> = DEFAULT_SPAM_PATTERNS
            .iter()
            .map(|pattern| format!("(?i){}", pattern))
            .collect();
        let set = RegexSet::new(&patterns).unwrap_or_else(|_| RegexSet::empty());
        Self { set }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Pass,
    LowEngagement,
    SmallAudience,
    LinkSpam,
    SpamPattern,
}

impl FilterVerdict {
    pub fn label(self) -> &'static str {
        match self {
            FilterVerdict::Pass => "pass",
            FilterVerdict::LowEngagement => "low_engagement",
            FilterVerdict::SmallAudience => "small_audience",
            FilterVerdict::LinkSpam => "link_spam",
            FilterVerdict::SpamPattern => "spam_pattern",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QualityFilter {
    config: QualityFilterConfig,
    spam: SpamPatterns,
}

impl QualityFilter {
    pub fn new(config: QualityFilterConfig) -> Result<Self> {
        let spam = match config.spam_patterns.as_ref() {
            Some(patterns) => SpamPatterns::new(patterns)?,
            None => SpamPatterns::default(),
        };
        Ok(Self { config, spam })
    }

    pub fn with_patterns(config: QualityFilterConfig, spam: SpamPatterns) -> Self {
        Self { config, spam }
    }

    pub fn config(&self) -> &QualityFilterConfig {
        &self.config
    }

    pub fn passes(&self, post: &Post) -> FilterVerdict {
        if post.primary_engagement() < self.config.min_engagement {
            return FilterVerdict::LowEngagement;
        }

        if let Some(followers) = post.author_followers() {
            if followers < self.config.min_followers {
                return FilterVerdict::SmallAudience;
            }
        }

        if count_urls(&post.text) > self.config.max_urls {
            return FilterVerdict::LinkSpam;
        }

        if self.config.enforce_spam_patterns && self.spam.is_match(&post.text) {
            return FilterVerdict::SpamPattern;
        }

        FilterVerdict::Pass
    }

    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        posts
            .into_iter()
            .filter(|post| {
                let verdict = self.passes(post);
                if verdict != FilterVerdict::Pass {
                    tracing::trace!(post_id = %post.id, reason = verdict.label(), "post rejected");
                }
                verdict == FilterVerdict::Pass
            })
            .collect()
    }
}

pub fn count_urls(text: &str) -> usize {
    let lowercase = text.to_lowercase();
    ["http://", "https://"]
        .iter()
        .map(|needle| lowercase.matches(needle).count())
        .sum()
}
