mod api;
mod bot;
mod discord;
mod llm;
mod reddit_api;
mod server;
mod tracker;
mod x_api;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use viral_monitor::analytics::PerformanceSummary;
use viral_monitor::config::{Credentials, DiscordUse, MonitorConfig, SourceKind, XCredentials};
use viral_monitor::history::RunHistoryStore;
use viral_monitor::runner::{Monitor, PostSource, ReportSink, RunEvent, RunOptions, RunOutcome};
use viral_monitor::status::{ControlCommand, FileStatusStore, StatusStore};
use viral_monitor::{format_float, format_number, truncate_text, MonitorError, Result};

use crate::discord::{DiscordReporter, StdoutReporter};
use crate::llm::LlmClient;
use crate::reddit_api::RedditClient;
use crate::tracker::TrackerCommand;
use crate::x_api::XApiClient;

#[derive(Parser)]
#[command(name = "viral-monitor", about = "Viral post monitor with reply suggestions")]
struct Cli {
    /// Path to the TOML config (defaults to MONITOR_CONFIG_PATH or config/monitor.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run one scan and post the report.
    Run(RunArgs),
    Enable,
    Disable,
    Toggle,
    Status,
    /// Start the Discord control bot.
    Bot,
    /// Start the HTTP control API.
    Serve(ServeArgs),
    /// Rank an account's recent posts by viral velocity.
    Analyze(AnalyzeArgs),
    /// Write the default config to disk.
    InitConfig(InitConfigArgs),
    #[command(flatten)]
    Tracker(TrackerCommand),
}

#[derive(Args, Debug, Clone, Default)]
struct RunArgs {
    /// Ignore the status flag and the active-hours window.
    #[arg(long)]
    force: bool,
    /// Print the report to stdout instead of Discord.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8787)]
    port: u16,
}

#[derive(Args, Debug, Clone)]
struct AnalyzeArgs {
    #[arg(long)]
    username: String,
    #[arg(long, default_value_t = 100)]
    min_likes: u64,
    #[arg(long, default_value_t = 100)]
    limit: usize,
    #[arg(long, default_value_t = 5)]
    top: usize,
}

#[derive(Args, Debug, Clone)]
struct InitConfigArgs {
    #[arg(long, default_value = "config/monitor.toml")]
    path: PathBuf,
    #[arg(long)]
    overwrite: bool,
}

#[tokio::main]
async fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));

    match command {
        Command::InitConfig(args) => init_config(args),
        command => {
            let (config, config_path) = MonitorConfig::load(cli.config)?;
            if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
                tracing::debug!(path = %path.display(), "loaded config");
            }
            dispatch(command, config).await
        }
    }
}

async fn dispatch(command: Command, config: MonitorConfig) -> Result<()> {
    let status: Arc<dyn StatusStore> = Arc::new(FileStatusStore::new(config.status.path.clone()));

    match command {
        Command::Enable => control(ControlCommand::Enable, status.as_ref()),
        Command::Disable => control(ControlCommand::Disable, status.as_ref()),
        Command::Toggle => control(ControlCommand::Toggle, status.as_ref()),
        Command::Status => control(ControlCommand::Status, status.as_ref()),
        Command::Run(args) => run_monitor(&config, status, args).await,
        Command::Bot => {
            let credentials = Credentials::from_env(config.source, DiscordUse::Required)?;
            let discord = credentials.discord()?;
            let monitor = Arc::new(build_monitor(&config, &credentials, status)?);
            let history = Arc::new(load_history(&config).await?);
            bot::ControlBot::new(monitor, history, discord.channel_id)
                .start(&discord.bot_token)
                .await
        }
        Command::Serve(args) => {
            let credentials = Credentials::from_env(config.source, DiscordUse::IfConfigured)?;
            let (events, _) = broadcast::channel::<RunEvent>(64);
            let monitor = build_monitor(&config, &credentials, status)?.with_events(events.clone());
            let context = server::ServerContext {
                monitor: Arc::new(monitor),
                history: Arc::new(load_history(&config).await?),
                discord: credentials.discord.as_ref().map(|discord| server::DiscordTarget {
                    bot_token: discord.bot_token.clone(),
                    channel_id: discord.channel_id,
                }),
                events,
            };
            server::serve(args, context).await
        }
        Command::Analyze(args) => analyze(&config, args).await,
        Command::InitConfig(args) => init_config(args),
        Command::Tracker(command) => tracker::dispatch(command, &config).await,
    }
}

fn control(command: ControlCommand, store: &dyn StatusStore) -> Result<()> {
    let status = command.apply(store)?;
    println!("Monitor status: {}", status);
    Ok(())
}

async fn run_monitor(config: &MonitorConfig, status: Arc<dyn StatusStore>, args: RunArgs) -> Result<()> {
    // Missing credentials fail the run before anything is fetched.
    let discord_use = if args.dry_run {
        DiscordUse::IfConfigured
    } else {
        DiscordUse::Required
    };
    let credentials = Credentials::from_env(config.source, discord_use)?;
    let monitor = build_monitor(config, &credentials, status)?;
    let options = RunOptions {
        force: args.force,
        now: Utc::now(),
    };

    let sink: Box<dyn ReportSink> = if args.dry_run {
        Box::new(StdoutReporter)
    } else {
        let discord = credentials.discord()?;
        Box::new(DiscordReporter::new(&discord.bot_token, discord.channel_id))
    };

    let outcome = monitor.run_once(sink.as_ref(), options).await?;
    match &outcome {
        RunOutcome::Disabled => println!("Monitor is disabled. Run `viral-monitor enable` to turn it on."),
        RunOutcome::OutsideActiveHours { utc_hour } => {
            println!("Outside active hours ({:02}:00 UTC), nothing to do.", utc_hour)
        }
        RunOutcome::NoQualifyingPosts => println!("No qualifying posts this run."),
        RunOutcome::Reported(summary) => {
            println!(
                "Reported {} posts ({} fetched, {} passed the quality filter).",
                summary.reports.len(),
                summary.fetched_total(),
                summary.passed_total()
            );
            let history = load_history(config).await?;
            history.add(summary.clone()).await?;
        }
    }
    Ok(())
}

fn build_monitor(
    config: &MonitorConfig,
    credentials: &Credentials,
    status: Arc<dyn StatusStore>,
) -> Result<Monitor> {
    let source: Arc<dyn PostSource> = match config.source {
        SourceKind::X => {
            let x = credentials
                .x
                .as_ref()
                .ok_or_else(|| MonitorError::MissingSettings(vec!["X_API_BEARER_TOKEN".to_string()]))?;
            Arc::new(XApiClient::new(x, &config.x, config.backoff.clone())?)
        }
        SourceKind::Reddit => Arc::new(RedditClient::new(&config.reddit, config.backoff.clone())?),
    };
    let replies = Arc::new(LlmClient::new(credentials.xai_api_key.clone(), &config.replies)?);
    tracing::info!(source = source.label(), style = config.replies.reply_style().label(), "monitor ready");
    Monitor::new(config, status, source, replies)
}

async fn load_history(config: &MonitorConfig) -> Result<RunHistoryStore> {
    RunHistoryStore::load(config.history.path.clone(), config.history.limit).await
}

async fn analyze(config: &MonitorConfig, args: AnalyzeArgs) -> Result<()> {
    let credentials = XCredentials::from_env()
        .ok_or_else(|| MonitorError::MissingSettings(vec!["X_API_BEARER_TOKEN".to_string()]))?;
    let client = XApiClient::new(&credentials, &config.x, config.backoff.clone())?;
    let username = args.username.trim_start_matches('@');

    let user = client.fetch_user_by_username(username).await?;
    let posts = client.fetch_user_posts(&user, args.limit).await?;
    let summary = PerformanceSummary::from_posts(&posts, args.min_likes, args.top);

    println!("Analyzed {} posts from @{}", summary.total, username);
    println!(
        "High performers (>= {} likes): {} | low performers: {}",
        format_number(args.min_likes),
        summary.high_performers,
        summary.low_performers
    );
    println!("Mean viral velocity: {}", format_float(summary.mean_velocity, 2));
    if let Some(bucket) = &summary.sweet_spot {
        println!("Length sweet spot: {}", bucket);
    }

    if !summary.top.is_empty() {
        println!("\nTop posts by velocity:");
        for (index, post) in summary.top.iter().enumerate() {
            println!(
                "{}. [{}] {} likes | {} reposts | {}",
                index + 1,
                format_float(post.velocity, 1),
                format_number(post.likes),
                format_number(post.reposts),
                truncate_text(&post.text, 80)
            );
            println!("   {}", post.url);
        }
    }
    Ok(())
}

fn init_config(args: InitConfigArgs) -> Result<()> {
    if args.path.exists() && !args.overwrite {
        return Err(MonitorError::Config(format!(
            "{} already exists (pass --overwrite to replace it)",
            args.path.display()
        )));
    }
    MonitorConfig::default().write(&args.path)?;
    println!("Wrote default config to {}", args.path.display());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let _ = dotenvy::from_path(Path::new(manifest_dir).join(".env.local"));
    let _ = dotenvy::from_path(Path::new(manifest_dir).join(".env"));
}
