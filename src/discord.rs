use async_trait::async_trait;
use serenity::all::{ChannelId, CreateEmbed, CreateEmbedFooter, CreateMessage, Timestamp};
use serenity::builder::{CreateActionRow, CreateButton};
use serenity::http::Http;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use viral_monitor::growth::{GrowthPace, WeeklyReport};
use viral_monitor::report::{Report, RunSummary};
use viral_monitor::runner::{ReportSink, RunHeader};
use viral_monitor::{format_float, format_number, truncate_text, EngagementFormula, MonitorError, Result};

const EMBED_TEXT_LIMIT: usize = 1_000;
const FIELD_LIMIT: usize = 1_024;

pub mod colors {
    pub const AMBER: u32 = 0xf59e0b;
    pub const BLUE: u32 = 0x3b82f6;
    pub const GRAY: u32 = 0x6b7280;
    pub const GREEN: u32 = 0x22c55e;
    pub const RED: u32 = 0xef4444;
}

/// Posts run reports to one channel over the Discord REST API.
pub struct DiscordReporter {
    http: Arc<Http>,
    channel_id: ChannelId,
    closed: AtomicBool,
}

impl DiscordReporter {
    pub fn new(bot_token: &str, channel_id: u64) -> Self {
        Self::with_http(Arc::new(Http::new(bot_token)), channel_id)
    }

    pub fn with_http(http: Arc<Http>, channel_id: u64) -> Self {
        Self {
            http,
            channel_id: ChannelId::new(channel_id),
            closed: AtomicBool::new(false),
        }
    }

    async fn send(&self, message: CreateMessage) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MonitorError::Transport("Discord reporter already closed".to_string()));
        }
        self.channel_id
            .send_message(&self.http, message)
            .await
            .map_err(|err| MonitorError::Transport(format!("failed to send Discord message: {}", err)))?;
        Ok(())
    }
}

impl DiscordReporter {
    /// Weekly progress embed, followed by the impressions chart when there is one.
    pub async fn post_weekly(&self, report: &WeeklyReport) -> Result<()> {
        self.send(CreateMessage::new().embed(weekly_embed(report))).await?;
        if let Some(chart) = &report.chart {
            self.send(CreateMessage::new().content(format!("```\n{}```", chart))).await?;
        }
        tracing::info!(channel_id = self.channel_id.get(), "weekly report posted");
        Ok(())
    }
}

#[async_trait]
impl ReportSink for DiscordReporter {
    async fn post_header(&self, header: &RunHeader) -> Result<()> {
        let embed = CreateEmbed::new()
            .color(colors::AMBER)
            .title(format!("Viral posts report: {} {}", header.local_time(), header.zone))
            .description(format!(
                "Top posts from {} with reply suggestions.",
                source_label(&header.source)
            ))
            .timestamp(Timestamp::now());
        self.send(CreateMessage::new().embed(embed)).await
    }

    async fn post_report(&self, report: &Report) -> Result<()> {
        let buttons = CreateActionRow::Buttons(vec![
            CreateButton::new_link(&report.post.url).label("Open post"),
        ]);
        let message = CreateMessage::new()
            .embed(report_embed(report))
            .components(vec![buttons]);
        self.send(message).await
    }

    async fn post_no_posts(&self) -> Result<()> {
        let embed = CreateEmbed::new()
            .color(colors::GRAY)
            .title("No viral posts found this hour")
            .description("Nothing passed the quality filter. Next check runs on schedule.")
            .timestamp(Timestamp::now());
        self.send(CreateMessage::new().embed(embed)).await
    }

    async fn post_footer(&self, summary: &RunSummary) -> Result<()> {
        let embed = CreateEmbed::new()
            .color(colors::GREEN)
            .title("Report complete")
            .description(footer_text(summary))
            .footer(CreateEmbedFooter::new(summary.run_id.clone()))
            .timestamp(Timestamp::now());
        self.send(CreateMessage::new().embed(embed)).await
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(channel_id = self.channel_id.get(), "Discord reporter closed");
        Ok(())
    }
}

/// Prints reports to stdout instead of posting them.
pub struct StdoutReporter;

#[async_trait]
impl ReportSink for StdoutReporter {
    async fn post_header(&self, header: &RunHeader) -> Result<()> {
        println!(
            "Viral posts report ({}): {} {} / {:02}:00 UTC",
            source_label(&header.source),
            header.local_time(),
            header.zone,
            header.utc_hour
        );
        Ok(())
    }

    async fn post_report(&self, report: &Report) -> Result<()> {
        println!("\n[{}] @{}", report.category.to_uppercase(), report.post.author_handle());
        println!("{}", truncate_text(&report.post.text, 280));
        println!("{}", engagement_line(report));
        println!("{}", report.post.url);
        for (index, reply) in report.replies.iter().enumerate() {
            println!("  {}. {}", index + 1, reply);
        }
        Ok(())
    }

    async fn post_no_posts(&self) -> Result<()> {
        println!("No viral posts found this hour.");
        Ok(())
    }

    async fn post_footer(&self, summary: &RunSummary) -> Result<()> {
        println!("\n{}", footer_text(summary));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

pub fn print_weekly(report: &WeeklyReport) {
    println!("Weekly @{} progress report", report.account);
    for (name, value) in weekly_fields(report) {
        println!("  {}: {}", name, value);
    }
    if let Some(chart) = &report.chart {
        println!("\n{}", chart);
    }
}

fn weekly_embed(report: &WeeklyReport) -> CreateEmbed {
    let color = match report.growth.as_ref().map(|growth| growth.pace) {
        Some(GrowthPace::Ahead) => colors::GREEN,
        Some(GrowthPace::OnTrack) => colors::BLUE,
        Some(GrowthPace::SlightlyBehind) => colors::AMBER,
        _ => colors::RED,
    };
    let mut embed = CreateEmbed::new()
        .color(color)
        .title(format!("Weekly @{} progress report", report.account))
        .description(format!("Week of {}", report.generated_at.format("%Y-%m-%d")))
        .footer(CreateEmbedFooter::new("Viral Monitor growth tracker"))
        .timestamp(Timestamp::now());
    for (name, value) in weekly_fields(report) {
        let inline = name != "Status";
        embed = embed.field(name, value, inline);
    }
    embed
}

fn weekly_fields(report: &WeeklyReport) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    match &report.growth {
        Some(growth) => {
            fields.push((
                "Progress to goal",
                format!(
                    "{}% of {}",
                    format_float(growth.progress_percent, 1),
                    format_number(growth.goal_impressions)
                ),
            ));
            fields.push(("Impressions", format_number(growth.impressions)));
            fields.push(("Followers", format_number(growth.followers)));
            fields.push(("Status", growth.pace.message().to_string()));
        }
        None => fields.push(("Status", "No growth metrics logged yet".to_string())),
    }
    if report.replies.is_empty() {
        fields.push(("Replies this week", "No data".to_string()));
        fields.push(("Avg likes per reply", "N/A".to_string()));
    } else {
        fields.push(("Replies this week", report.replies.total_replies.to_string()));
        fields.push(("Avg likes per reply", format_number(report.replies.avg_likes)));
    }
    fields
}

fn report_embed(report: &Report) -> CreateEmbed {
    let post = &report.post;
    let author = match post.author_followers() {
        Some(followers) => format!("@{} ({} followers)", post.author_handle(), format_number(followers)),
        None => format!("@{}", post.author_handle()),
    };

    let replies = if report.replies.is_empty() || report.replies_failed() {
        "_Reply suggestions unavailable_".to_string()
    } else {
        let numbered: Vec<String> = report
            .replies
            .iter()
            .enumerate()
            .map(|(index, reply)| format!("**{}.** {}", index + 1, reply))
            .collect();
        truncate_text(&numbered.join("\n\n"), FIELD_LIMIT)
    };

    CreateEmbed::new()
        .color(category_color(&report.category))
        .title(format!("{} | viral post", report.category.to_uppercase()))
        .url(&post.url)
        .description(truncate_text(&post.text, EMBED_TEXT_LIMIT))
        .field("Author", author, true)
        .field("Engagement", engagement_line(report), true)
        .field("Score", format_number(post.engagement_score()), true)
        .field("Reply suggestions", replies, false)
        .timestamp(Timestamp::now())
}

fn engagement_line(report: &Report) -> String {
    let metrics = &report.post.metrics;
    match report.post.formula() {
        EngagementFormula::Reposts => format!(
            "{} likes | {} reposts | {} replies",
            format_number(metrics.likes),
            format_number(metrics.reposts),
            format_number(metrics.replies)
        ),
        EngagementFormula::Upvotes => format!(
            "{} upvotes | {} comments",
            format_number(metrics.likes),
            format_number(metrics.replies)
        ),
    }
}

fn footer_text(summary: &RunSummary) -> String {
    let per_category: Vec<String> = summary
        .category_stats
        .iter()
        .map(|stats| format!("{}: {}/{}", stats.category, stats.passed, stats.fetched))
        .collect();
    format!(
        "Fetched {} posts, {} passed the quality filter, {} reported.\nPassed/fetched by category: {}",
        summary.fetched_total(),
        summary.passed_total(),
        summary.reports.len(),
        per_category.join(", ")
    )
}

fn source_label(source: &str) -> &'static str {
    match source {
        "reddit" => "Reddit",
        _ => "X",
    }
}

fn category_color(category: &str) -> u32 {
    match category {
        "tech" => colors::BLUE,
        "crypto" => 0x375bd2,
        "ai" => 0x8b5cf6,
        _ => colors::GRAY,
    }
}
