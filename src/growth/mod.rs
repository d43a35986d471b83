//! Own-account growth tooling: reply performance, growth metrics, voice profile.

pub mod metrics;
pub mod replies;
pub mod voice;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::GrowthConfig;
use crate::Result;

pub use metrics::{GrowthDeltas, GrowthEntry, GrowthGoal, GrowthLog, GrowthPace, GrowthReport, GrowthSnapshot};
pub use replies::{
    CheckSummary, LoggedReply, PostMetricsLookup, ReplyInsights, ReplyLog, ReplyReport, ReplyThresholds, TopReply,
};
pub use voice::{ReplyContext, ReplySuggestion, VoiceProfile};

impl GrowthConfig {
    pub fn goal(&self) -> GrowthGoal {
        GrowthGoal {
            impressions: self.impressions_goal,
            days: self.goal_days,
        }
    }

    pub fn reply_thresholds(&self) -> ReplyThresholds {
        ReplyThresholds {
            high_likes: self.reply_high_likes,
            low_likes: self.reply_low_likes,
        }
    }
}

/// Growth and reply performance combined for the weekly post.
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyReport {
    pub generated_at: DateTime<Utc>,
    pub account: String,
    pub growth: Option<GrowthReport>,
    pub replies: ReplyReport,
    pub chart: Option<String>,
}

impl WeeklyReport {
    pub async fn assemble(config: &GrowthConfig, now: DateTime<Utc>) -> Result<Self> {
        let growth_log = GrowthLog::load(config.metrics_path.clone()).await?;
        let reply_log = ReplyLog::load(config.replies_path.clone()).await?;
        Ok(Self {
            generated_at: now,
            account: config.account.clone(),
            growth: growth_log.report(config.goal(), now).await,
            replies: reply_log.report(now, &config.account, config.reply_thresholds()).await,
            chart: growth_log.chart().await,
        })
    }
}
