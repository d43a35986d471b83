use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::trace::TraceLayer;

use crate::api::{RunRequest, RunResponse, StatusRequest, StatusResponse};
use crate::discord::{DiscordReporter, StdoutReporter};
use viral_monitor::history::RunHistoryStore;
use viral_monitor::report::RunSummary;
use viral_monitor::runner::{now_ms, Monitor, ReportSink, RunEvent, RunOptions, RunOutcome};
use viral_monitor::status::StatusStore;
use viral_monitor::MonitorError;

#[derive(Clone)]
struct AppState {
    monitor: Arc<Monitor>,
    status: Arc<dyn StatusStore>,
    history: Arc<RunHistoryStore>,
    discord: Option<DiscordTarget>,
    events: broadcast::Sender<RunEvent>,
}

#[derive(Clone)]
pub struct DiscordTarget {
    pub bot_token: String,
    pub channel_id: u64,
}

pub struct ServerContext {
    pub monitor: Arc<Monitor>,
    pub history: Arc<RunHistoryStore>,
    pub discord: Option<DiscordTarget>,
    pub events: broadcast::Sender<RunEvent>,
}

pub async fn serve(args: crate::ServeArgs, context: ServerContext) -> Result<(), MonitorError> {
    let state = AppState {
        status: context.monitor.status_store(),
        monitor: context.monitor,
        history: context.history,
        discord: context.discord,
        events: context.events,
    };

    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(get_status).post(set_status))
        .route("/api/run", post(run_handler))
        .route("/api/run/stream", get(stream_handler))
        .route("/api/runs", get(list_runs))
        .route("/api/runs/:run_id", get(get_run))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|err| MonitorError::Config(format!("invalid bind address: {}", err)))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| MonitorError::io("bind server", err))?;
    tracing::info!(%addr, "control API listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| MonitorError::Transport(format!("server error: {}", err)))?;

    Ok(())
}

async fn health() -> impl IntoResponse {
    StatusCode::OK
}

async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let status = state.status.get().map_err(error_response)?;
    Ok(Json(status.into()))
}

async fn set_status(
    State(state): State<AppState>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, String)> {
    let command = request.into_command().map_err(|err| (StatusCode::BAD_REQUEST, err))?;
    let status = command.apply(state.status.as_ref()).map_err(error_response)?;
    tracing::info!(?command, status = %status, "status changed over HTTP");
    Ok(Json(status.into()))
}

async fn run_handler(
    State(state): State<AppState>,
    request: Option<Json<RunRequest>>,
) -> Result<Json<RunResponse>, (StatusCode, String)> {
    let request = request.map(|Json(request)| request).unwrap_or_default();

    let options = RunOptions {
        force: request.force.unwrap_or(true),
        now: Utc::now(),
    };
    let dry_run = request.dry_run.unwrap_or(false);
    send_event(&state.events, "start", "Run requested over HTTP");

    let outcome = match (&state.discord, dry_run) {
        (Some(target), false) => {
            let reporter = DiscordReporter::new(&target.bot_token, target.channel_id);
            run_with(&state, &reporter, options).await
        }
        _ => run_with(&state, &StdoutReporter, options).await,
    }
    .map_err(error_response)?;

    if let RunOutcome::Reported(summary) = &outcome {
        if let Err(err) = state.history.add(summary.clone()).await {
            tracing::warn!(error = %err, "failed to persist run history");
        }
    }

    Ok(Json(outcome.into()))
}

async fn run_with(
    state: &AppState,
    sink: &dyn ReportSink,
    options: RunOptions,
) -> Result<RunOutcome, MonitorError> {
    state.monitor.run_once(sink, options).await
}

async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>> {
    let receiver = state.events.subscribe();
    let stream = BroadcastStream::new(receiver).filter_map(|event| match event {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().event(event.event.clone()).data(data)))
        }
        Err(_) => None,
    });

    send_event(&state.events, "connected", "Streaming run events");
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(8)))
}

async fn list_runs(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    Json(state.history.list().await)
}

async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> Result<Json<RunSummary>, StatusCode> {
    state
        .history
        .get(&run_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

fn send_event(sender: &broadcast::Sender<RunEvent>, event: &str, message: &str) {
    let _ = sender.send(RunEvent {
        event: event.to_string(),
        message: message.to_string(),
        timestamp_ms: now_ms(),
    });
}

fn error_response(err: MonitorError) -> (StatusCode, String) {
    let status = match &err {
        MonitorError::RunInProgress => StatusCode::CONFLICT,
        MonitorError::Fetch(_) | MonitorError::Generation(_) | MonitorError::Transport(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::error!(error = %err, "request failed");
    (status, err.to_string())
}
