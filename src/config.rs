use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::backoff::BackoffPolicy;
use crate::persona::ReplyStyle;
use crate::scoring::category::default_categories;
use crate::scoring::{Category, QualityFilterConfig, QueryStrategy, SelectionConfig};
use crate::{MonitorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    X,
    Reddit,
}

impl SourceKind {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "x" | "twitter" => Some(SourceKind::X),
            "reddit" => Some(SourceKind::Reddit),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::X => "x",
            SourceKind::Reddit => "reddit",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XConfig {
    pub api_base: String,
    pub query_strategy: QueryStrategy,
    pub posts_per_category: usize,
    pub timeout_ms: u64,
}

impl Default for XConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.twitter.com/2".to_string(),
            query_strategy: QueryStrategy::Accounts,
            posts_per_category: 30,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub api_base: String,
    pub user_agent: String,
    /// `hot` or `rising`.
    pub listing: String,
    pub posts_per_category: usize,
    pub timeout_ms: u64,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            api_base: "https://www.reddit.com".to_string(),
            user_agent: "ViralMonitor/1.0".to_string(),
            listing: "hot".to_string(),
            posts_per_category: 25,
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub style: String,
    pub model: String,
    pub api_base: String,
    pub max_tokens: u32,
    pub timeout_ms: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            style: "chainlinkp".to_string(),
            model: "grok-2-1212".to_string(),
            api_base: "https://api.x.ai/v1".to_string(),
            max_tokens: 300,
            timeout_ms: 30_000,
        }
    }
}

impl ReplyConfig {
    pub fn reply_style(&self) -> ReplyStyle {
        ReplyStyle::from_name(&self.style)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Inclusive UTC hour window `[start, end]` in which scheduled runs report.
    /// `None` reports at any hour.
    pub active_hours_utc: Option<[u8; 2]>,
    /// Offset applied to the UTC hour when printing the local report time.
    pub display_offset_hours: i32,
    pub display_zone: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            active_hours_utc: Some([0, 4]),
            display_offset_hours: 7,
            display_zone: "Bangkok".to_string(),
        }
    }
}

impl ScheduleConfig {
    pub fn is_active(&self, utc_hour: u8) -> bool {
        match self.active_hours_utc {
            None => true,
            Some([start, end]) if start <= end => (start..=end).contains(&utc_hour),
            // Window wraps midnight, e.g. [22, 2].
            Some([start, end]) => utc_hour >= start || utc_hour <= end,
        }
    }

    pub fn local_hour(&self, utc_hour: u8) -> u8 {
        (utc_hour as i32 + self.display_offset_hours).rem_euclid(24) as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub path: PathBuf,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/viral-monitor.status"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/run-history.json"),
            limit: 50,
        }
    }
}

/// Files and targets for the account growth tooling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    /// Own account; replies and voice training are read from it.
    pub account: String,
    pub replies_path: PathBuf,
    pub metrics_path: PathBuf,
    pub voice_path: PathBuf,
    pub impressions_goal: u64,
    pub goal_days: i64,
    /// Likes at or above which a logged reply counts as a winner.
    pub reply_high_likes: u64,
    /// Likes below which a logged reply counts as a miss.
    pub reply_low_likes: u64,
    /// Likes at or above which an own post counts as a high performer during voice training.
    pub voice_min_likes: u64,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            account: "chainlinkp".to_string(),
            replies_path: PathBuf::from("data/reply-performance.json"),
            metrics_path: PathBuf::from("data/growth-metrics.json"),
            voice_path: PathBuf::from("data/voice-profile.json"),
            impressions_goal: 5_000_000,
            goal_days: 90,
            reply_high_likes: 10,
            reply_low_likes: 5,
            voice_min_likes: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub source: SourceKind,
    pub filter: QualityFilterConfig,
    pub selection: SelectionConfig,
    pub categories: Vec<Category>,
    pub x: XConfig,
    pub reddit: RedditConfig,
    pub replies: ReplyConfig,
    pub backoff: BackoffPolicy,
    pub schedule: ScheduleConfig,
    pub status: StatusConfig,
    pub history: HistoryConfig,
    pub growth: GrowthConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::X,
            filter: QualityFilterConfig::default(),
            selection: SelectionConfig::default(),
            categories: default_categories(),
            x: XConfig::default(),
            reddit: RedditConfig::default(),
            replies: ReplyConfig::default(),
            backoff: BackoffPolicy::default(),
            schedule: ScheduleConfig::default(),
            status: StatusConfig::default(),
            history: HistoryConfig::default(),
            growth: GrowthConfig::default(),
        }
    }
}

impl MonitorConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| MonitorError::io("read config", err))?;
                Self::from_toml(&contents)?
            }
            _ => MonitorConfig::default(),
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| MonitorError::parse("config", err))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|err| MonitorError::io("create config dir", err))?;
            }
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| MonitorError::parse("config for writing", err))?;
        std::fs::write(path, payload).map_err(|err| MonitorError::io("write config", err))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(MonitorError::Config("at least one category is required".to_string()));
        }
        if self.selection.global_top == 0 || self.selection.top_per_category == 0 {
            return Err(MonitorError::Config(
                "selection sizes must be at least 1".to_string(),
            ));
        }
        if self.x.timeout_ms == 0 || self.reddit.timeout_ms == 0 || self.replies.timeout_ms == 0 {
            return Err(MonitorError::Config("request timeouts must be at least 1 ms".to_string()));
        }
        if self.growth.goal_days <= 0 {
            return Err(MonitorError::Config("growth.goal_days must be positive".to_string()));
        }
        if let Some([start, end]) = self.schedule.active_hours_utc {
            if start > 23 || end > 23 {
                return Err(MonitorError::Config(format!(
                    "invalid active hours (0-23): [{}, {}]",
                    start, end
                )));
            }
        }
        Ok(())
    }

    /// Environment values win over the file. A value that does not parse is an
    /// error naming the key, never a silent fallback to the default.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(value) = non_empty("MONITOR_SOURCE") {
            self.source = SourceKind::from_str(&value).ok_or_else(|| invalid_override("MONITOR_SOURCE", &value))?;
        }
        if let Some(value) = non_empty("MIN_ENGAGEMENT") {
            self.filter.min_engagement = parse_override("MIN_ENGAGEMENT", &value)?;
        }
        if let Some(value) = non_empty("MIN_FOLLOWERS") {
            self.filter.min_followers = parse_override("MIN_FOLLOWERS", &value)?;
        }
        if let Some(value) = non_empty("ENFORCE_SPAM_PATTERNS") {
            self.filter.enforce_spam_patterns =
                parse_bool(&value).ok_or_else(|| invalid_override("ENFORCE_SPAM_PATTERNS", &value))?;
        }
        if let Some(style) = non_empty("REPLY_STYLE") {
            self.replies.style = style;
        }
        if let Some(model) = non_empty("XAI_MODEL") {
            self.replies.model = model;
        }
        if let Some(base) = non_empty("XAI_API_BASE") {
            self.replies.api_base = base;
        }
        if let Some(base) = non_empty("X_API_BASE") {
            self.x.api_base = base;
        }
        if let Some(value) = non_empty("X_TIMEOUT_MS") {
            self.x.timeout_ms = parse_override("X_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = non_empty("REDDIT_TIMEOUT_MS") {
            self.reddit.timeout_ms = parse_override("REDDIT_TIMEOUT_MS", &value)?;
        }
        if let Some(path) = non_empty("MONITOR_STATUS_PATH") {
            self.status.path = PathBuf::from(path);
        }
        if let Some(account) = non_empty("GROWTH_ACCOUNT") {
            self.growth.account = account.trim_start_matches('@').to_string();
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| invalid_override(key, value))
}

fn invalid_override(key: &str, value: &str) -> MonitorError {
    MonitorError::Config(format!("{} has an invalid value: {:?}", key, value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("MONITOR_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/monitor.toml")))
}

#[derive(Debug, Clone)]
pub enum XCredentials {
    Bearer(String),
    OAuthClient {
        client_id: String,
        client_secret: String,
    },
}

impl XCredentials {
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// A bearer token wins over OAuth client credentials when both are set.
    pub fn from_lookup<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(&lookup, key);
        if let Some(token) = get("X_API_BEARER_TOKEN").or_else(|| get("X_BEARER_TOKEN")) {
            return Some(XCredentials::Bearer(token));
        }
        get("X_OAUTH_CLIENT_ID")
            .zip(get("X_OAUTH_CLIENT_SECRET"))
            .map(|(client_id, client_secret)| XCredentials::OAuthClient {
                client_id,
                client_secret,
            })
    }
}

#[derive(Debug, Clone)]
pub struct DiscordCredentials {
    pub bot_token: String,
    pub channel_id: u64,
}

impl DiscordCredentials {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        match Self::collect(&lookup, &mut missing)? {
            Some(discord) => Ok(discord),
            None => Err(MonitorError::MissingSettings(missing)),
        }
    }

    /// Pushes the names of absent keys onto `missing`. A channel id that is
    /// present but not numeric is an error on its own.
    fn collect<F>(lookup: &F, missing: &mut Vec<String>) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = non_empty(lookup, "DISCORD_BOT_TOKEN");
        if bot_token.is_none() {
            missing.push("DISCORD_BOT_TOKEN".to_string());
        }
        let channel_id = match non_empty(lookup, "DISCORD_CHANNEL_ID") {
            Some(value) => Some(value.parse::<u64>().map_err(|_| {
                MonitorError::Config(format!("DISCORD_CHANNEL_ID is not a numeric id: {}", value))
            })?),
            None => {
                missing.push("DISCORD_CHANNEL_ID".to_string());
                None
            }
        };
        Ok(bot_token
            .zip(channel_id)
            .map(|(bot_token, channel_id)| Self { bot_token, channel_id }))
    }
}

/// Whether a command posts to Discord. Commands that never do (dry runs,
/// the HTTP API without a channel) do not need the Discord keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscordUse {
    Required,
    IfConfigured,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub x: Option<XCredentials>,
    pub xai_api_key: String,
    pub discord: Option<DiscordCredentials>,
}

impl Credentials {
    pub fn from_env(source: SourceKind, discord: DiscordUse) -> Result<Self> {
        Self::from_lookup(source, discord, |key| env::var(key).ok())
    }

    /// Collects every missing item before failing so the error names all of them.
    pub fn from_lookup<F>(source: SourceKind, discord_use: DiscordUse, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();

        let x = if source == SourceKind::X {
            let x = XCredentials::from_lookup(&lookup);
            if x.is_none() {
                missing.push("X_API_BEARER_TOKEN".to_string());
            }
            x
        } else {
            None
        };

        let xai_api_key = non_empty(&lookup, "XAI_API_KEY");
        if xai_api_key.is_none() {
            missing.push("XAI_API_KEY".to_string());
        }

        let discord = match discord_use {
            DiscordUse::Required => DiscordCredentials::collect(&lookup, &mut missing)?,
            DiscordUse::IfConfigured => DiscordCredentials::collect(&lookup, &mut Vec::new())?,
        };

        match xai_api_key {
            Some(xai_api_key) if missing.is_empty() => Ok(Self {
                x,
                xai_api_key,
                discord,
            }),
            _ => Err(MonitorError::MissingSettings(missing)),
        }
    }

    pub fn discord(&self) -> Result<&DiscordCredentials> {
        self.discord.as_ref().ok_or_else(|| {
            MonitorError::MissingSettings(vec![
                "DISCORD_BOT_TOKEN".to_string(),
                "DISCORD_CHANNEL_ID".to_string(),
            ])
        })
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
