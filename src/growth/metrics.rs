use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::Mutex;

use crate::storage::{read_json, write_json};
use crate::{format_number, Result};

const CHART_ENTRIES: usize = 10;

/// Account-level numbers as read from the analytics dashboard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthSnapshot {
    pub impressions: u64,
    pub followers: u64,
    pub following: u64,
    /// Percent, e.g. `3.4`.
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthDeltas {
    pub impressions: i64,
    pub followers: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthEntry {
    pub recorded_at: DateTime<Utc>,
    pub week: u32,
    pub impressions: u64,
    pub followers: u64,
    pub following: u64,
    pub engagement_rate: f64,
    /// Change since the previous entry; absent on the first one.
    pub deltas: Option<GrowthDeltas>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct GrowthFile {
    entries: Vec<GrowthEntry>,
}

#[derive(Debug, Clone, Copy)]
pub struct GrowthGoal {
    pub impressions: u64,
    /// Counted from the first logged entry.
    pub days: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPace {
    NeedMoreData,
    Ahead,
    OnTrack,
    SlightlyBehind,
    OffPace,
}

impl GrowthPace {
    fn from_rates(current_daily: i64, needed_daily: i64) -> Self {
        if current_daily <= 0 {
            return GrowthPace::NeedMoreData;
        }
        if needed_daily <= 0 {
            return GrowthPace::Ahead;
        }
        let ratio = current_daily as f64 / needed_daily as f64;
        if ratio >= 1.2 {
            GrowthPace::Ahead
        } else if ratio >= 1.0 {
            GrowthPace::OnTrack
        } else if ratio >= 0.7 {
            GrowthPace::SlightlyBehind
        } else {
            GrowthPace::OffPace
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            GrowthPace::NeedMoreData => "Need more data for pace calculation",
            GrowthPace::Ahead => "Ahead of pace",
            GrowthPace::OnTrack => "On track, keep it up",
            GrowthPace::SlightlyBehind => "Slightly behind, need more volume",
            GrowthPace::OffPace => "Off pace, time to grind harder",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GrowthReport {
    pub started_at: DateTime<Utc>,
    pub latest_at: DateTime<Utc>,
    pub days_active: i64,
    pub impressions: u64,
    pub followers: u64,
    pub engagement_rate: f64,
    pub goal_impressions: u64,
    pub progress_percent: f64,
    pub days_remaining: i64,
    /// Impressions per day between the last two entries.
    pub current_daily: i64,
    pub needed_daily: i64,
    pub on_track: bool,
    pub pace: GrowthPace,
    pub deltas: Option<GrowthDeltas>,
}

/// Append-only log of account growth snapshots.
pub struct GrowthLog {
    path: PathBuf,
    data: Mutex<GrowthFile>,
}

impl GrowthLog {
    pub async fn load(path: PathBuf) -> Result<Self> {
        let data = read_json(&path, "growth metrics").await?;
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub async fn entries(&self) -> Vec<GrowthEntry> {
        self.data.lock().await.entries.clone()
    }

    pub async fn log(&self, snapshot: GrowthSnapshot, now: DateTime<Utc>) -> Result<GrowthEntry> {
        let mut guard = self.data.lock().await;
        let deltas = guard.entries.last().map(|last| GrowthDeltas {
            impressions: snapshot.impressions as i64 - last.impressions as i64,
            followers: snapshot.followers as i64 - last.followers as i64,
            engagement_rate: round2(snapshot.engagement_rate - last.engagement_rate),
        });
        let entry = GrowthEntry {
            recorded_at: now,
            week: now.ordinal0() / 7 + 1,
            impressions: snapshot.impressions,
            followers: snapshot.followers,
            following: snapshot.following,
            engagement_rate: snapshot.engagement_rate,
            deltas,
        };
        guard.entries.push(entry.clone());
        write_json(&self.path, &*guard, "growth metrics").await?;
        tracing::info!(impressions = entry.impressions, followers = entry.followers, "growth metrics logged");
        Ok(entry)
    }

    /// `None` until at least one entry exists.
    pub async fn report(&self, goal: GrowthGoal, now: DateTime<Utc>) -> Option<GrowthReport> {
        let guard = self.data.lock().await;
        let entries = &guard.entries;
        let start = entries.first()?;
        let latest = entries.last()?;

        let days_remaining = (start.recorded_at + Duration::days(goal.days) - now).num_days();
        let impressions_needed = goal.impressions.saturating_sub(latest.impressions) as i64;
        let needed_daily = if days_remaining > 0 {
            (impressions_needed + days_remaining - 1) / days_remaining
        } else {
            0
        };

        let current_daily = match entries.len() {
            0 | 1 => 0,
            len => {
                let previous = &entries[len - 2];
                let days_between = (latest.recorded_at - previous.recorded_at).num_days();
                if days_between > 0 {
                    ((latest.impressions as f64 - previous.impressions as f64) / days_between as f64).round() as i64
                } else {
                    0
                }
            }
        };

        Some(GrowthReport {
            started_at: start.recorded_at,
            latest_at: latest.recorded_at,
            days_active: (latest.recorded_at - start.recorded_at).num_days(),
            impressions: latest.impressions,
            followers: latest.followers,
            engagement_rate: latest.engagement_rate,
            goal_impressions: goal.impressions,
            progress_percent: if goal.impressions == 0 {
                100.0
            } else {
                latest.impressions as f64 / goal.impressions as f64 * 100.0
            },
            days_remaining,
            current_daily,
            needed_daily,
            on_track: current_daily >= needed_daily,
            pace: GrowthPace::from_rates(current_daily, needed_daily),
            deltas: latest.deltas,
        })
    }

    /// Text table of the last ten entries; `None` with fewer than two.
    pub async fn chart(&self) -> Option<String> {
        let guard = self.data.lock().await;
        if guard.entries.len() < 2 {
            return None;
        }
        let skip = guard.entries.len().saturating_sub(CHART_ENTRIES);
        let entries = &guard.entries[skip..];

        let mut chart = String::from("IMPRESSIONS GROWTH\nWeek  |  Impressions  |  Trend\n");
        chart.push_str("------+---------------+--------\n");
        for (index, entry) in entries.iter().enumerate() {
            let trend = match index.checked_sub(1).map(|prev| &entries[prev]) {
                None => "-",
                Some(prev) if entry.impressions > prev.impressions => "up",
                Some(_) => "flat",
            };
            chart.push_str(&format!(
                "{:>4}  | {:>13} |  {}\n",
                index + 1,
                format_number(entry.impressions),
                trend
            ));
        }
        Some(chart)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
