use chrono::Utc;
use clap::{Args, Subcommand};

use viral_monitor::config::{DiscordCredentials, MonitorConfig, XCredentials};
use viral_monitor::growth::{
    GrowthLog, GrowthSnapshot, LoggedReply, ReplyContext, ReplyLog, VoiceProfile, WeeklyReport,
};
use viral_monitor::{format_float, format_number, MonitorError, Result};

use crate::discord::{print_weekly, DiscordReporter};
use crate::x_api::XApiClient;

#[derive(Subcommand)]
pub enum TrackerCommand {
    /// Log a reply you posted.
    LogReply(LogReplyArgs),
    /// Fetch engagement for logged replies not checked yet.
    CheckReplies,
    /// Reply performance over the last seven days.
    ReplyReport,
    /// Build the voice profile from your own recent posts.
    TrainVoice(TrainVoiceArgs),
    /// Show the saved voice profile.
    VoiceSummary,
    /// Reply guidelines from the voice profile.
    Suggest(SuggestArgs),
    /// Log a growth metrics snapshot.
    LogMetrics(LogMetricsArgs),
    /// Progress toward the impressions goal.
    GrowthReport,
    /// Impressions chart of the latest snapshots.
    GrowthChart,
    /// Post the weekly progress report to Discord.
    WeeklyReport(WeeklyReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct LogReplyArgs {
    #[arg(long)]
    post_id: String,
    #[arg(long)]
    original_url: String,
    #[arg(long)]
    text: String,
    #[arg(long, default_value = "viral")]
    category: String,
}

#[derive(Args, Debug, Clone)]
pub struct TrainVoiceArgs {
    /// Defaults to the configured growth account.
    #[arg(long)]
    username: Option<String>,
    #[arg(long)]
    min_likes: Option<u64>,
    #[arg(long, default_value_t = 100)]
    limit: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SuggestArgs {
    /// imminent, positive or neutral.
    #[arg(long, default_value = "neutral")]
    context: String,
}

#[derive(Args, Debug, Clone)]
pub struct LogMetricsArgs {
    #[arg(long)]
    impressions: u64,
    #[arg(long)]
    followers: u64,
    #[arg(long)]
    following: u64,
    /// Percent, e.g. 3.4.
    #[arg(long)]
    engagement_rate: f64,
}

#[derive(Args, Debug, Clone)]
pub struct WeeklyReportArgs {
    /// Print the report instead of posting it.
    #[arg(long)]
    dry_run: bool,
}

pub async fn dispatch(command: TrackerCommand, config: &MonitorConfig) -> Result<()> {
    let growth = &config.growth;
    match command {
        TrackerCommand::LogReply(args) => {
            let log = ReplyLog::load(growth.replies_path.clone()).await?;
            let reply = LoggedReply::new(args.post_id, args.original_url, args.text, Utc::now())
                .with_category(args.category);
            let id = reply.id.clone();
            if log.log(reply).await? {
                println!("Logged reply {}. Check engagement later with `viral-monitor check-replies`.", id);
            } else {
                println!("Reply {} is already logged.", id);
            }
            Ok(())
        }
        TrackerCommand::CheckReplies => {
            let client = x_client(config)?;
            let log = ReplyLog::load(growth.replies_path.clone()).await?;
            let summary = log
                .check_engagement(&client, Utc::now(), config.backoff.request_delay())
                .await?;
            if summary.checked == 0 && summary.failed == 0 {
                println!("No new replies to check.");
            } else {
                println!("Checked {} replies ({} failed).", summary.checked, summary.failed);
            }
            Ok(())
        }
        TrackerCommand::ReplyReport => {
            let log = ReplyLog::load(growth.replies_path.clone()).await?;
            let report = log.report(Utc::now(), &growth.account, growth.reply_thresholds()).await;
            if report.is_empty() {
                println!("No checked replies in the last {} days yet.", report.period_days);
                return Ok(());
            }
            println!("Reply performance, last {} days", report.period_days);
            println!(
                "Replies: {} | total likes: {} | avg likes: {}",
                report.total_replies,
                format_number(report.total_likes),
                format_number(report.avg_likes)
            );
            for (index, top) in report.top.iter().enumerate() {
                println!("{}. [{} likes] {}", index + 1, format_number(top.likes), top.text);
                println!("   {}", top.url);
            }
            match &report.insights {
                Some(insights) => {
                    println!("\n{} ({} high performers)", insights.pattern, insights.high_performers);
                    println!("Tip: {}", insights.tip);
                }
                None => println!("\nNeed more data for insights."),
            }
            Ok(())
        }
        TrackerCommand::TrainVoice(args) => {
            let client = x_client(config)?;
            let username = args.username.unwrap_or_else(|| growth.account.clone());
            let min_likes = args.min_likes.unwrap_or(growth.voice_min_likes);
            let user = client.fetch_user_by_username(&username).await?;
            let posts = client.fetch_user_posts(&user, args.limit).await?;
            tracing::info!(username = %username, posts = posts.len(), "training voice profile");

            let profile = VoiceProfile::build(&username, &posts, min_likes, Utc::now());
            profile.save(&growth.voice_path).await?;
            println!(
                "Voice profile saved: {} posts, {} high performers. View it with `viral-monitor voice-summary`.",
                profile.performance.total, profile.performance.high_performers
            );
            Ok(())
        }
        TrackerCommand::VoiceSummary => {
            let Some(profile) = VoiceProfile::load(&growth.voice_path).await? else {
                println!("No voice profile. Run `viral-monitor train-voice` first.");
                return Ok(());
            };
            println!("@{} voice profile", profile.username);
            println!("Analyzed: {}", profile.analyzed_at.format("%Y-%m-%d %H:%M UTC"));
            println!("Posts: {}", profile.performance.total);
            println!("High performers (>= {} likes): {}", profile.min_likes, profile.performance.high_performers);
            if let Some(bucket) = &profile.performance.sweet_spot {
                println!("Sweet spot: {}", bucket);
            }
            if let Some(length) = profile.high_length {
                println!("High performer length: {} avg ({}-{})", length.mean, length.min, length.max);
            }
            for pattern in &profile.patterns.winning {
                println!("  + {}", pattern);
            }
            for pattern in &profile.patterns.avoid {
                println!("  - {}", pattern);
            }
            println!("\nTop templates:");
            for template in profile.templates.iter().take(3) {
                println!("  * {} ({}x)", template.pattern, template.count);
            }
            println!("\nTop phrases:");
            for phrase in profile.phrases.iter().take(5) {
                println!("  * \"{}\" ({}x)", phrase.phrase, phrase.count);
            }
            Ok(())
        }
        TrackerCommand::Suggest(args) => {
            let Some(profile) = VoiceProfile::load(&growth.voice_path).await? else {
                println!("No voice profile. Run `viral-monitor train-voice` first.");
                return Ok(());
            };
            let suggestion = profile.suggest(ReplyContext::from_name(&args.context));
            println!("Template: {}", suggestion.template);
            if let Some(example) = &suggestion.example {
                println!("Example: {}", example);
            }
            for guideline in &suggestion.guidelines {
                println!("  - {}", guideline);
            }
            Ok(())
        }
        TrackerCommand::LogMetrics(args) => {
            if !args.engagement_rate.is_finite() || args.engagement_rate < 0.0 {
                return Err(MonitorError::Config(format!(
                    "engagement rate must be a non-negative percent: {}",
                    args.engagement_rate
                )));
            }
            let log = GrowthLog::load(growth.metrics_path.clone()).await?;
            let entry = log
                .log(
                    GrowthSnapshot {
                        impressions: args.impressions,
                        followers: args.followers,
                        following: args.following,
                        engagement_rate: args.engagement_rate,
                    },
                    Utc::now(),
                )
                .await?;
            println!("Logged week {} snapshot.", entry.week);
            if let Some(deltas) = entry.deltas {
                println!(
                    "Change since last entry: {:+} impressions, {:+} followers, {:+} engagement",
                    deltas.impressions, deltas.followers, deltas.engagement_rate
                );
            }
            Ok(())
        }
        TrackerCommand::GrowthReport => {
            let log = GrowthLog::load(growth.metrics_path.clone()).await?;
            let Some(report) = log.report(growth.goal(), Utc::now()).await else {
                println!("No metrics logged yet. Run `viral-monitor log-metrics` first.");
                return Ok(());
            };
            println!("Growth dashboard for @{}", growth.account);
            println!(
                "Tracking since {} ({} days)",
                report.started_at.format("%Y-%m-%d"),
                report.days_active
            );
            println!(
                "Impressions: {} | followers: {} | engagement: {}%",
                format_number(report.impressions),
                format_number(report.followers),
                format_float(report.engagement_rate, 2)
            );
            println!(
                "Progress: {}% of {} ({} days left)",
                format_float(report.progress_percent, 1),
                format_number(report.goal_impressions),
                report.days_remaining
            );
            println!(
                "Daily pace: {} now, {} needed",
                report.current_daily, report.needed_daily
            );
            println!("Status: {}", report.pace.message());
            Ok(())
        }
        TrackerCommand::GrowthChart => {
            let log = GrowthLog::load(growth.metrics_path.clone()).await?;
            match log.chart().await {
                Some(chart) => print!("{}", chart),
                None => println!("Need at least 2 snapshots for a chart."),
            }
            Ok(())
        }
        TrackerCommand::WeeklyReport(args) => {
            let report = WeeklyReport::assemble(growth, Utc::now()).await?;
            if args.dry_run {
                print_weekly(&report);
                return Ok(());
            }
            let discord = DiscordCredentials::from_env()?;
            DiscordReporter::new(&discord.bot_token, discord.channel_id)
                .post_weekly(&report)
                .await
        }
    }
}

fn x_client(config: &MonitorConfig) -> Result<XApiClient> {
    let credentials = XCredentials::from_env()
        .ok_or_else(|| MonitorError::MissingSettings(vec!["X_API_BEARER_TOKEN".to_string()]))?;
    XApiClient::new(&credentials, &config.x, config.backoff.clone())
}
