use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;

use viral_monitor::backoff::BackoffPolicy;
use viral_monitor::config::RedditConfig;
use viral_monitor::runner::PostSource;
use viral_monitor::scoring::{Category, CategoryBatch};
use viral_monitor::{Author, EngagementFormula, MonitorError, Post, PostMetrics, Result};

/// Public JSON listings; no credentials required.
#[derive(Clone)]
pub struct RedditClient {
    client: reqwest::Client,
    api_base: String,
    user_agent: String,
    listing: String,
    backoff: BackoffPolicy,
}

impl RedditClient {
    pub fn new(config: &RedditConfig, backoff: BackoffPolicy) -> Result<Self> {
        let listing = match config.listing.to_lowercase().as_str() {
            "rising" => "rising",
            _ => "hot",
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| MonitorError::Config(format!("failed to build Reddit client: {}", err)))?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            user_agent: config.user_agent.clone(),
            listing: listing.to_string(),
            backoff,
        })
    }

    pub async fn fetch_listing(&self, subreddit: &str, limit: usize) -> Result<Vec<Post>> {
        let url = format!(
            "{}/r/{}/{}.json",
            self.api_base.trim_end_matches('/'),
            urlencoding::encode(subreddit),
            self.listing
        );
        let limit = limit.clamp(1, 100).to_string();
        let mut attempt = 0u32;

        loop {
            let response = self
                .client
                .get(&url)
                .query(&[("limit", limit.as_str())])
                .header(USER_AGENT, &self.user_agent)
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|err| MonitorError::Fetch(format!("Reddit request failed: {}", err)))?;

            let status = response.status();
            if status.is_success() {
                let body: Listing = response
                    .json()
                    .await
                    .map_err(|err| MonitorError::Fetch(format!("Reddit response parse failed: {}", err)))?;
                return Ok(map_listing(body));
            }

            if self.backoff.should_retry(attempt, status.as_u16()) {
                let wait = self.backoff.delay_for_attempt(attempt);
                tracing::warn!(%status, subreddit, attempt, "Reddit throttled, retrying");
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            return Err(MonitorError::Fetch(format!("Reddit API error: {}", status)));
        }
    }
}

#[async_trait]
impl PostSource for RedditClient {
    fn label(&self) -> &'static str {
        "reddit"
    }

    /// Each category pulls from its subreddits; a failing subreddit is logged and skipped.
    async fn fetch_category_posts(&self, categories: &[Category], per_category: usize) -> Vec<CategoryBatch> {
        let delay = self.backoff.request_delay();
        let mut batches = Vec::with_capacity(categories.len());

        for category in categories {
            let mut posts = Vec::new();
            for subreddit in &category.subreddits {
                match self.fetch_listing(subreddit, per_category).await {
                    Ok(fetched) => posts.extend(
                        fetched
                            .into_iter()
                            .map(|post| post.with_category(&category.name)),
                    ),
                    Err(err) => {
                        tracing::error!(category = %category.name, subreddit, error = %err, "subreddit fetch failed");
                    }
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            if category.subreddits.is_empty() {
                tracing::warn!(category = %category.name, "category has no subreddits, skipping");
            }
            batches.push(CategoryBatch::new(&category.name, posts));
        }

        batches
    }
}

fn map_listing(body: Listing) -> Vec<Post> {
    body.data
        .children
        .into_iter()
        .map(|child| {
            let p = child.data;
            let text = if p.selftext.trim().is_empty() {
                p.title.clone()
            } else {
                format!("{}\n\n{}", p.title, p.selftext)
            };
            let created_at = DateTime::<Utc>::from_timestamp(p.created_utc as i64, 0);
            let author = p.author.filter(|name| name != "[deleted]").map(Author::new);
            Post::new(
                p.id,
                text,
                format!("https://reddit.com{}", p.permalink),
                author,
                PostMetrics {
                    likes: p.score.max(0) as u64,
                    reposts: 0,
                    replies: p.num_comments,
                    quotes: 0,
                    impressions: 0,
                },
                created_at,
                EngagementFormula::Upvotes,
            )
        })
        .collect()
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: RedditPost,
}

#[derive(Deserialize)]
struct RedditPost {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    permalink: String,
    author: Option<String>,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_listing_with_upvote_formula() {
        let payload = r#"{"data": {"children": [
            {"data": {"id": "abc", "title": "LINK staking v0.2", "selftext": "",
                      "permalink": "/r/Chainlink/comments/abc/", "author": "sergey",
                      "created_utc": 1735787045.0, "score": 120, "num_comments": 8}}
        ]}}"#;
        let body: Listing = serde_json::from_str(payload).unwrap();
        let posts = map_listing(body);

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].text, "LINK staking v0.2");
        assert_eq!(posts[0].engagement_score(), 120 + 5 * 8);
        assert_eq!(posts[0].url, "https://reddit.com/r/Chainlink/comments/abc/");
        assert_eq!(posts[0].author_followers(), None);
    }

    #[tokio::test]
    async fn hung_listing_request_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut open = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                open.push(socket);
            }
        });

        let config = RedditConfig {
            api_base: format!("http://{}", addr),
            timeout_ms: 50,
            ..RedditConfig::default()
        };
        let client = RedditClient::new(&config, BackoffPolicy::immediate()).unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch_listing("rust", 10).await.unwrap_err();
        assert!(matches!(err, MonitorError::Fetch(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
