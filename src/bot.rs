use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, ChannelId, ComponentInteraction, Context, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage, CreateMessage, EventHandler, GatewayIntents, Interaction,
    Message, Ready, Timestamp,
};
use serenity::builder::{CreateActionRow, CreateButton};
use serenity::http::Http;
use serenity::Client;
use std::sync::Arc;

use crate::discord::{colors, DiscordReporter};
use viral_monitor::history::RunHistoryStore;
use viral_monitor::runner::{Monitor, RunOptions, RunOutcome};
use viral_monitor::status::{ControlCommand, MonitorStatus, StatusStore};
use viral_monitor::{MonitorError, Result};

const START_ID: &str = "start_monitor";
const STOP_ID: &str = "stop_monitor";
const RUN_ID: &str = "run_now";
const REFRESH_ID: &str = "status_check";

/// Chat control surface. Text commands and buttons both go through the
/// shared [`StatusStore`], same as the CLI.
pub struct ControlBot {
    status: Arc<dyn StatusStore>,
    monitor: Arc<Monitor>,
    history: Arc<RunHistoryStore>,
    channel_id: ChannelId,
}

impl ControlBot {
    pub fn new(monitor: Arc<Monitor>, history: Arc<RunHistoryStore>, channel_id: u64) -> Self {
        Self {
            status: monitor.status_store(),
            monitor,
            history,
            channel_id: ChannelId::new(channel_id),
        }
    }

    pub async fn start(self, bot_token: &str) -> Result<()> {
        let intents = GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;
        let mut client = Client::builder(bot_token, intents)
            .event_handler(self)
            .await
            .map_err(|err| MonitorError::Transport(format!("failed to create Discord client: {}", err)))?;

        client
            .start()
            .await
            .map_err(|err| MonitorError::Transport(format!("Discord client error: {}", err)))
    }

    fn current_status(&self) -> MonitorStatus {
        self.status.get().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "failed to read monitor status");
            MonitorStatus::Disabled
        })
    }

    async fn post_panel(&self, http: &Arc<Http>) {
        let status = self.current_status();
        let message = CreateMessage::new()
            .embed(panel_embed(status, "Viral Monitor"))
            .components(vec![panel_buttons(status)]);
        if let Err(err) = self.channel_id.send_message(http, message).await {
            tracing::warn!(error = %err, "failed to post control panel");
        } else {
            tracing::info!(status = %status, "posted control panel");
        }
    }

    fn apply(&self, command: ControlCommand, actor: &str) -> MonitorStatus {
        match command.apply(self.status.as_ref()) {
            Ok(status) => {
                tracing::info!(?command, status = %status, actor, "control command applied");
                status
            }
            Err(err) => {
                tracing::error!(?command, error = %err, "control command failed");
                self.current_status()
            }
        }
    }

    async fn handle_text(&self, ctx: &Context, msg: &Message) {
        let content = msg.content.trim().to_uppercase();
        let actor = msg.author.name.as_str();
        match content.as_str() {
            "STATUS" => self.post_panel(&ctx.http).await,
            "START" => {
                self.apply(ControlCommand::Enable, actor);
                self.post_panel(&ctx.http).await;
                self.spawn_scan(Arc::clone(&ctx.http));
            }
            "STOP" => {
                self.apply(ControlCommand::Disable, actor);
                self.post_panel(&ctx.http).await;
            }
            "RUN" => self.spawn_scan(Arc::clone(&ctx.http)),
            _ => {}
        }
    }

    async fn handle_button(&self, ctx: &Context, interaction: &ComponentInteraction) {
        let actor = interaction.user.name.as_str();
        let custom_id = interaction.data.custom_id.as_str();

        let status = match custom_id {
            START_ID => self.apply(ControlCommand::Enable, actor),
            STOP_ID => self.apply(ControlCommand::Disable, actor),
            REFRESH_ID => self.current_status(),
            RUN_ID => {
                let response = CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content("Running scan now...")
                        .ephemeral(true),
                );
                if let Err(err) = interaction.create_response(&ctx.http, response).await {
                    tracing::warn!(error = %err, "failed to acknowledge run button");
                }
                self.spawn_scan(Arc::clone(&ctx.http));
                return;
            }
            other => {
                tracing::debug!(custom_id = other, "ignoring unknown button");
                return;
            }
        };

        let response = CreateInteractionResponse::UpdateMessage(
            CreateInteractionResponseMessage::new()
                .embed(panel_embed(status, "Viral Monitor"))
                .components(vec![panel_buttons(status)]),
        );
        if let Err(err) = interaction.create_response(&ctx.http, response).await {
            tracing::warn!(error = %err, "failed to update control panel");
        }

        if custom_id == START_ID {
            self.spawn_scan(Arc::clone(&ctx.http));
        }
    }

    fn spawn_scan(&self, http: Arc<Http>) {
        let monitor = Arc::clone(&self.monitor);
        let history = Arc::clone(&self.history);
        let channel_id = self.channel_id;
        tokio::spawn(async move {
            let reporter = DiscordReporter::with_http(Arc::clone(&http), channel_id.get());
            let embed = match monitor.run_once(&reporter, RunOptions::forced()).await {
                Ok(outcome) => {
                    if let RunOutcome::Reported(summary) = &outcome {
                        if let Err(err) = history.add(summary.clone()).await {
                            tracing::warn!(error = %err, "failed to persist run history");
                        }
                    }
                    CreateEmbed::new()
                        .color(colors::BLUE)
                        .title("Scan complete")
                        .description(format!("Outcome: {}", outcome.label()))
                        .timestamp(Timestamp::now())
                }
                Err(MonitorError::RunInProgress) => CreateEmbed::new()
                    .color(colors::AMBER)
                    .title("Scan already running")
                    .description("Results from the current scan will post here when it finishes.")
                    .timestamp(Timestamp::now()),
                Err(err) => {
                    tracing::error!(error = %err, "scan failed");
                    CreateEmbed::new()
                        .color(colors::RED)
                        .title("Scan error")
                        .description(err.to_string())
                        .timestamp(Timestamp::now())
                }
            };
            if let Err(err) = channel_id.send_message(&http, CreateMessage::new().embed(embed)).await {
                tracing::warn!(error = %err, "failed to post scan result");
            }
        });
    }
}

#[async_trait]
impl EventHandler for ControlBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(username = %ready.user.name, "Discord control bot connected");
        self.post_panel(&ctx.http).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.channel_id != self.channel_id || msg.author.bot {
            return;
        }
        self.handle_text(&ctx, &msg).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Component(component) = interaction {
            if component.channel_id != self.channel_id {
                return;
            }
            self.handle_button(&ctx, &component).await;
        }
    }
}

fn panel_embed(status: MonitorStatus, title: &str) -> CreateEmbed {
    let (color, label) = if status.is_enabled() {
        (colors::GREEN, "ENABLED")
    } else {
        (colors::GRAY, "DISABLED")
    };
    CreateEmbed::new()
        .color(color)
        .title(title)
        .description("Monitors viral posts for reply opportunities.")
        .field("Status", label, true)
        .field("Text commands", "START, STOP, STATUS, RUN", true)
        .timestamp(Timestamp::now())
}

fn panel_buttons(status: MonitorStatus) -> CreateActionRow {
    let enabled = status.is_enabled();
    CreateActionRow::Buttons(vec![
        CreateButton::new(START_ID)
            .label("START")
            .style(ButtonStyle::Success)
            .disabled(enabled),
        CreateButton::new(STOP_ID)
            .label("STOP")
            .style(ButtonStyle::Danger)
            .disabled(!enabled),
        CreateButton::new(RUN_ID)
            .label("RUN NOW")
            .style(ButtonStyle::Primary),
        CreateButton::new(REFRESH_ID)
            .label("REFRESH")
            .style(ButtonStyle::Secondary),
    ])
}
