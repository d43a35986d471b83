use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use viral_monitor::backoff::BackoffPolicy;
use viral_monitor::config::{XConfig, XCredentials};
use viral_monitor::growth::PostMetricsLookup;
use viral_monitor::runner::PostSource;
use viral_monitor::scoring::{combined_search_query, Category, CategoryBatch, QueryStrategy};
use viral_monitor::{Author, EngagementFormula, MonitorError, Post, PostMetrics, Result};

const TWEET_FIELDS: &str = "public_metrics,author_id,created_at";
const USER_FIELDS: &str = "username,name,public_metrics,verified";

#[derive(Clone)]
pub struct XApiClient {
    client: reqwest::Client,
    api_base: String,
    auth: XApiAuth,
    strategy: QueryStrategy,
    backoff: BackoffPolicy,
}

#[derive(Clone)]
enum XApiAuth {
    Bearer(String),
    OAuthClientCredentials {
        client_id: String,
        client_secret: String,
        token_url: String,
        scope: Option<String>,
        auth_mode: OAuthAuthMode,
        token_cache: Arc<Mutex<Option<OAuthTokenCache>>>,
    },
}

#[derive(Clone)]
struct OAuthTokenCache {
    access_token: String,
    expires_at: Instant,
}

#[derive(Clone, Copy)]
enum OAuthAuthMode {
    Basic,
    Body,
}

impl XApiClient {
    pub fn new(credentials: &XCredentials, config: &XConfig, backoff: BackoffPolicy) -> Result<Self> {
        let auth = match credentials {
            XCredentials::Bearer(token) => XApiAuth::Bearer(decode_bearer(token.clone())),
            XCredentials::OAuthClient {
                client_id,
                client_secret,
            } => {
                let token_url = env::var("X_OAUTH_TOKEN_URL")
                    .unwrap_or_else(|_| "https://api.twitter.com/2/oauth2/token".to_string());
                let scope = env::var("X_OAUTH_SCOPE").ok().filter(|value| !value.trim().is_empty());
                let auth_mode = match env::var("X_OAUTH_AUTH_MODE")
                    .unwrap_or_else(|_| "basic".to_string())
                    .to_lowercase()
                    .as_str()
                {
                    "basic" => OAuthAuthMode::Basic,
                    _ => OAuthAuthMode::Body,
                };
                XApiAuth::OAuthClientCredentials {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    token_url,
                    scope,
                    auth_mode,
                    token_cache: Arc::new(Mutex::new(None)),
                }
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| MonitorError::Config(format!("failed to build X API client: {}", err)))?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            auth,
            strategy: config.query_strategy,
            backoff,
        })
    }

    /// Recent search (last 7 days), excluding replies and retweets via the query.
    pub async fn search_recent(&self, query: &str, max_results: usize) -> Result<Vec<Post>> {
        let max_results = max_results.clamp(10, 100).to_string();
        let body: TweetsResponse = self
            .get_json(
                "tweets/search/recent",
                &[
                    ("query", query),
                    ("max_results", max_results.as_str()),
                    ("tweet.fields", TWEET_FIELDS),
                    ("expansions", "author_id"),
                    ("user.fields", USER_FIELDS),
                    ("sort_order", "relevancy"),
                ],
            )
            .await?;
        Ok(map_tweets(body))
    }

    pub async fn fetch_user_by_username(&self, username: &str) -> Result<XUserSummary> {
        let path = format!("users/by/username/{}", urlencoding::encode(username.trim_start_matches('@')));
        let body: XUserResponse = self.get_json(&path, &[("user.fields", USER_FIELDS)]).await?;
        let user = body
            .data
            .ok_or_else(|| MonitorError::Fetch("X API response missing user data".to_string()))?;
        Ok(XUserSummary {
            id: user.id.clone(),
            author: user.into_author(),
        })
    }

    /// Latest original posts from one account.
    pub async fn fetch_user_posts(&self, user: &XUserSummary, max_results: usize) -> Result<Vec<Post>> {
        let path = format!("users/{}/tweets", user.id);
        let max_results = max_results.clamp(5, 100).to_string();
        let body: TweetsResponse = self
            .get_json(
                &path,
                &[
                    ("max_results", max_results.as_str()),
                    ("exclude", "replies,retweets"),
                    ("tweet.fields", TWEET_FIELDS),
                ],
            )
            .await?;
        let mut posts = map_tweets(body);
        for post in posts.iter_mut() {
            if post.author.is_none() {
                post.author = Some(user.author.clone());
            }
        }
        Ok(posts)
    }

    pub async fn fetch_post_metrics(&self, post_id: &str) -> Result<PostMetrics> {
        let path = format!("tweets/{}", urlencoding::encode(post_id));
        let body: SingleTweetResponse = self.get_json(&path, &[("tweet.fields", "public_metrics")]).await?;
        let tweet = body
            .data
            .ok_or_else(|| MonitorError::Fetch(format!("X API returned no post for {}", post_id)))?;
        Ok(tweet.public_metrics.unwrap_or_default().into())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}/{}", self.api_base.trim_end_matches('/'), path);
        let mut attempt = 0u32;

        loop {
            let token = self.bearer_token().await?;
            let response = self
                .client
                .get(&url)
                .query(query)
                .header(AUTHORIZATION, format!("Bearer {}", token))
                .send()
                .await
                .map_err(|err| MonitorError::Fetch(format!("X API request failed: {}", err)))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json()
                    .await
                    .map_err(|err| MonitorError::Fetch(format!("X API response parse failed: {}", err)));
            }

            if self.backoff.should_retry(attempt, status.as_u16()) {
                let wait = self.backoff.delay_for_attempt(attempt);
                tracing::warn!(%status, attempt, wait_ms = wait.as_millis() as u64, "X API throttled, retrying");
                tokio::time::sleep(wait).await;
                attempt += 1;
                continue;
            }

            let error_body = response.text().await.unwrap_or_default();
            let detail = error_body.trim();
            if detail.is_empty() {
                return Err(MonitorError::Fetch(format!("X API error: {}", status)));
            }
            return Err(MonitorError::Fetch(format!("X API error: {} {}", status, detail)));
        }
    }

    async fn bearer_token(&self) -> Result<String> {
        match &self.auth {
            XApiAuth::Bearer(token) => Ok(token.clone()),
            XApiAuth::OAuthClientCredentials {
                client_id,
                client_secret,
                token_url,
                scope,
                auth_mode,
                token_cache,
            } => {
                let now = Instant::now();
                {
                    let guard = token_cache.lock().await;
                    if let Some(cache) = guard.as_ref() {
                        if now < cache.expires_at {
                            return Ok(cache.access_token.clone());
                        }
                    }
                }

                let token = self
                    .fetch_oauth_token(client_id, client_secret, token_url, scope.as_deref(), *auth_mode)
                    .await?;
                let mut guard = token_cache.lock().await;
                *guard = Some(token.clone());
                Ok(token.access_token)
            }
        }
    }

    async fn fetch_oauth_token(
        &self,
        client_id: &str,
        client_secret: &str,
        token_url: &str,
        scope: Option<&str>,
        auth_mode: OAuthAuthMode,
    ) -> Result<OAuthTokenCache> {
        let mut params = vec![
            ("grant_type".to_string(), "client_credentials".to_string()),
            ("client_id".to_string(), client_id.to_string()),
            ("client_secret".to_string(), client_secret.to_string()),
        ];
        if let Some(scope_value) = scope {
            params.push(("scope".to_string(), scope_value.to_string()));
        }

        let mut request = self.client.post(token_url);
        if matches!(auth_mode, OAuthAuthMode::Basic) {
            request = request.basic_auth(client_id, Some(client_secret));
        }

        let response = request
            .form(&params)
            .send()
            .await
            .map_err(|err| MonitorError::Fetch(format!("X OAuth token request failed: {}", err)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MonitorError::Fetch(format!(
                "X OAuth token error: {} {}",
                status,
                detail.trim()
            )));
        }

        let body: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|err| MonitorError::Fetch(format!("X OAuth token parse failed: {}", err)))?;

        let expires_in = body.expires_in.unwrap_or(3600);
        let expires_at = Instant::now() + Duration::from_secs(expires_in.saturating_sub(30));
        Ok(OAuthTokenCache {
            access_token: body.access_token,
            expires_at,
        })
    }
}

#[async_trait]
impl PostMetricsLookup for XApiClient {
    async fn post_metrics(&self, post_id: &str) -> Result<PostMetrics> {
        self.fetch_post_metrics(post_id).await
    }
}

#[async_trait]
impl PostSource for XApiClient {
    fn label(&self) -> &'static str {
        "x"
    }

    async fn fetch_category_posts(&self, categories: &[Category], per_category: usize) -> Vec<CategoryBatch> {
        if self.strategy == QueryStrategy::Combined {
            return vec![self.fetch_combined(categories, per_category).await];
        }

        let mut batches = Vec::with_capacity(categories.len());
        let delay = self.backoff.request_delay();

        for (index, category) in categories.iter().enumerate() {
            let Some(query) = category.search_query(self.strategy) else {
                tracing::warn!(category = %category.name, "category has no accounts or keywords, skipping");
                batches.push(CategoryBatch::empty(&category.name));
                continue;
            };

            let posts = match self.search_recent(&query, per_category).await {
                Ok(posts) => posts
                    .into_iter()
                    .map(|post| post.with_category(&category.name))
                    .collect(),
                Err(err) => {
                    tracing::error!(category = %category.name, error = %err, "category fetch failed");
                    Vec::new()
                }
            };
            batches.push(CategoryBatch::new(&category.name, posts));

            if index + 1 < categories.len() && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        batches
    }
}

impl XApiClient {
    /// One search for every category's keywords; the selector sorts the
    /// results into categories by content.
    async fn fetch_combined(&self, categories: &[Category], per_category: usize) -> CategoryBatch {
        let Some(query) = combined_search_query(categories) else {
            tracing::warn!("no category has keywords, nothing to search");
            return CategoryBatch::mixed(Vec::new());
        };
        let wanted = per_category.saturating_mul(categories.len().max(1));
        match self.search_recent(&query, wanted).await {
            Ok(posts) => CategoryBatch::mixed(posts),
            Err(err) => {
                tracing::error!(error = %err, "combined fetch failed");
                CategoryBatch::mixed(Vec::new())
            }
        }
    }
}

fn decode_bearer(value: String) -> String {
    if value.contains('%') {
        match urlencoding::decode(&value) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => value,
        }
    } else {
        value
    }
}

fn map_tweets(body: TweetsResponse) -> Vec<Post> {
    let users: HashMap<String, XUser> = body
        .includes
        .map(|includes| includes.users)
        .unwrap_or_default()
        .into_iter()
        .map(|user| (user.id.clone(), user))
        .collect();

    body.data
        .unwrap_or_default()
        .into_iter()
        .map(|tweet| {
            let author = tweet
                .author_id
                .as_ref()
                .and_then(|id| users.get(id))
                .cloned()
                .map(XUser::into_author);
            let handle = author
                .as_ref()
                .map(|author| author.username.clone())
                .unwrap_or_else(|| "user".to_string());
            let metrics = tweet.public_metrics.unwrap_or_default();
            Post::new(
                tweet.id.clone(),
                tweet.text,
                format!("https://twitter.com/{}/status/{}", handle, tweet.id),
                author,
                metrics.into(),
                tweet.created_at,
                EngagementFormula::Reposts,
            )
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct XUserSummary {
    pub id: String,
    pub author: Author,
}

#[derive(Deserialize)]
struct TweetsResponse {
    data: Option<Vec<XTweet>>,
    includes: Option<XIncludes>,
}

#[derive(Deserialize)]
struct XIncludes {
    #[serde(default)]
    users: Vec<XUser>,
}

#[derive(Deserialize)]
struct XTweet {
    id: String,
    text: String,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<XTweetMetrics>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct XTweetMetrics {
    like_count: u64,
    retweet_count: u64,
    reply_count: u64,
    quote_count: u64,
    impression_count: u64,
}

impl From<XTweetMetrics> for PostMetrics {
    fn from(metrics: XTweetMetrics) -> Self {
        PostMetrics {
            likes: metrics.like_count,
            reposts: metrics.retweet_count,
            replies: metrics.reply_count,
            quotes: metrics.quote_count,
            impressions: metrics.impression_count,
        }
    }
}

#[derive(Deserialize)]
struct SingleTweetResponse {
    data: Option<XTweet>,
}

#[derive(Deserialize)]
struct XUserResponse {
    data: Option<XUser>,
}

#[derive(Deserialize, Clone)]
struct XUser {
    id: String,
    username: String,
    name: Option<String>,
    verified: Option<bool>,
    public_metrics: Option<XPublicMetrics>,
}

impl XUser {
    fn into_author(self) -> Author {
        Author {
            username: self.username,
            name: self.name,
            followers: self.public_metrics.map(|metrics| metrics.followers_count),
            verified: self.verified.unwrap_or(false),
        }
    }
}

#[derive(Deserialize, Clone)]
struct XPublicMetrics {
    followers_count: u64,
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}
