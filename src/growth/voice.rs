use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analytics::PerformanceSummary;
use crate::storage::{read_json, write_json};
use crate::{Post, Result};

const TRACKED_PHRASES: &[&str] = &[
    "tick tock",
    "you love to see it",
    "bullish",
    "bearish",
    "this is",
    "pretty",
    "very cool",
    "unreal",
    "incredible",
    "insane",
    "enormous",
    "damn",
];
const MAX_PHRASES: usize = 10;
const SHORT_TAKE_CHARS: usize = 60;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoicePatterns {
    pub winning: Vec<String>,
    pub avoid: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceTemplate {
    pub pattern: String,
    pub example: String,
    pub usage: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseCount {
    pub phrase: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LengthRange {
    pub mean: usize,
    pub min: usize,
    pub max: usize,
}

impl LengthRange {
    fn of(posts: &[&Post]) -> Option<Self> {
        let lengths: Vec<usize> = posts.iter().map(|post| post.text.chars().count()).collect();
        let min = *lengths.iter().min()?;
        let max = *lengths.iter().max()?;
        let mean = (lengths.iter().sum::<usize>() as f64 / lengths.len() as f64).round() as usize;
        Some(Self { mean, min, max })
    }
}

/// Writing patterns mined from the account's own best posts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub username: String,
    pub analyzed_at: DateTime<Utc>,
    pub min_likes: u64,
    pub performance: PerformanceSummary,
    pub patterns: VoicePatterns,
    pub templates: Vec<VoiceTemplate>,
    pub phrases: Vec<PhraseCount>,
    pub high_length: Option<LengthRange>,
    pub low_length: Option<LengthRange>,
}

/// What the post being replied to is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyContext {
    Imminent,
    Positive,
    Neutral,
}

impl ReplyContext {
    /// Unknown names fall back to neutral.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "imminent" => ReplyContext::Imminent,
            "positive" => ReplyContext::Positive,
            _ => ReplyContext::Neutral,
        }
    }
}

/// Guidelines for writing a reply in the account's voice. No text is generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplySuggestion {
    pub template: String,
    pub example: Option<String>,
    pub guidelines: Vec<String>,
}

impl VoiceProfile {
    pub fn build(username: &str, posts: &[Post], min_likes: u64, now: DateTime<Utc>) -> Self {
        let (high, low): (Vec<&Post>, Vec<&Post>) =
            posts.iter().partition(|post| post.metrics.likes >= min_likes);

        Self {
            username: username.trim_start_matches('@').to_string(),
            analyzed_at: now,
            min_likes,
            performance: PerformanceSummary::from_posts(posts, min_likes, 5),
            patterns: patterns(&high, &low),
            templates: templates(&high),
            phrases: phrases(&high),
            high_length: LengthRange::of(&high),
            low_length: LengthRange::of(&low),
        }
    }

    pub async fn load(path: &Path) -> Result<Option<Self>> {
        read_json(path, "voice profile").await
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        write_json(path, self, "voice profile").await
    }

    pub fn suggest(&self, context: ReplyContext) -> ReplySuggestion {
        let preferred = match context {
            ReplyContext::Imminent => Some("Tick tock"),
            ReplyContext::Positive => Some("love to see"),
            ReplyContext::Neutral => None,
        };
        let template = preferred
            .and_then(|needle| self.templates.iter().find(|t| t.pattern.contains(needle)))
            .or_else(|| self.templates.first());

        let mut guidelines = Vec::new();
        if let Some(bucket) = &self.performance.sweet_spot {
            guidelines.push(format!("Target length: {}", bucket));
        }
        if !self.phrases.is_empty() {
            let common: Vec<&str> = self.phrases.iter().take(3).map(|p| p.phrase.as_str()).collect();
            guidelines.push(format!("Common phrases: {}", common.join(", ")));
        }
        guidelines.push("Use short sentences".to_string());
        guidelines.push("Avoid emojis".to_string());
        if let Some(template) = template {
            guidelines.push(format!("Context: {}", template.usage));
        }

        ReplySuggestion {
            template: template
                .map(|t| t.pattern.clone())
                .unwrap_or_else(|| "Short observation".to_string()),
            example: template.map(|t| t.example.clone()),
            guidelines,
        }
    }
}

fn share(posts: &[&Post], predicate: impl Fn(&Post) -> bool) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    posts.iter().filter(|&&post| predicate(post)).count() as f64 / posts.len() as f64
}

fn patterns(high: &[&Post], low: &[&Post]) -> VoicePatterns {
    let mut patterns = VoicePatterns::default();
    let chars = |post: &Post| post.text.chars().count();

    if share(high, |post| chars(post) < 50) > 0.6 {
        patterns.winning.push("Short posts (under 50 chars) perform better".to_string());
    }
    if share(high, |post| post.text.contains('?')) > 0.3 {
        patterns.winning.push("Questions drive engagement".to_string());
    }
    if share(high, |post| post.text.contains('!')) > share(high, |post| post.text.trim_end().ends_with('.')) {
        patterns.winning.push("Exclamations over periods".to_string());
    }
    if share(low, |post| chars(post) > 150) > 0.5 {
        patterns.avoid.push("Long posts (over 150 chars) underperform".to_string());
    }
    patterns
}

fn templates(high: &[&Post]) -> Vec<VoiceTemplate> {
    let mut templates = Vec::new();

    let tick_tock = containing(high, "tick tock");
    if let Some(first) = tick_tock.first() {
        templates.push(VoiceTemplate {
            pattern: "Tick tock.".to_string(),
            example: first.text.clone(),
            usage: "Imminent news or buildup".to_string(),
            count: tick_tock.len(),
        });
    }

    let love_to_see = containing(high, "you love to see it");
    if let Some(first) = love_to_see.first() {
        templates.push(VoiceTemplate {
            pattern: "You love to see it.".to_string(),
            example: first.text.clone(),
            usage: "Good news or positive developments".to_string(),
            count: love_to_see.len(),
        });
    }

    let short_takes: Vec<&Post> = high
        .iter()
        .copied()
        .filter(|post| post.text.chars().count() < SHORT_TAKE_CHARS && !post.text.contains("http"))
        .collect();
    if short_takes.len() > 3 {
        templates.push(VoiceTemplate {
            pattern: format!("Short observation (< {} chars)", SHORT_TAKE_CHARS),
            example: short_takes[0].text.clone(),
            usage: "Quick reactions to news".to_string(),
            count: short_takes.len(),
        });
    }
    templates
}

fn containing<'a>(posts: &[&'a Post], needle: &str) -> Vec<&'a Post> {
    posts
        .iter()
        .copied()
        .filter(|post| post.text.to_lowercase().contains(needle))
        .collect()
}

fn phrases(high: &[&Post]) -> Vec<PhraseCount> {
    let lowered: Vec<String> = high.iter().map(|post| post.text.to_lowercase()).collect();
    let mut counts: Vec<PhraseCount> = TRACKED_PHRASES
        .iter()
        .map(|phrase| PhraseCount {
            phrase: phrase.to_string(),
            count: lowered.iter().filter(|text| text.contains(phrase)).count(),
        })
        .filter(|entry| entry.count > 0)
        .collect();
    // Stable: ties keep the tracked-phrase order.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(MAX_PHRASES);
    counts
}
