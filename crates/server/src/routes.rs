use animelog_core::error::ApiError;
use animelog_core::types::{EpisodeNumber, Show, WatchStatus};
use animelog_db::repo::shows;
use animelog_library::{CollectionTotals, MergeSummary, categorize};
use animelog_scanner::controller::ScanCommand;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Scanner commands
        .route("/scan", get(scan_status))
        .route("/scan/full", post(start_full_scan))
        .route("/scan/quick", post(start_quick_scan))
        .route("/scan/stop", post(stop_scan))
        // Collection
        .route("/shows", get(list_shows).delete(reset_shows))
        .route(
            "/shows/{title}/seasons/{season}/episodes/{episode}/status",
            put(update_episode_status),
        )
        .route("/summary", get(summary))
        .route("/events", get(sse_events))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| ApiError::Internal(format!("database check failed: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ScanStatusResponse {
    scanning: bool,
}

async fn scan_status(State(state): State<AppState>) -> Json<ScanStatusResponse> {
    Json(ScanStatusResponse {
        scanning: state.scanner.is_scanning(),
    })
}

#[derive(Serialize)]
struct CommandAccepted {
    command: ScanCommand,
}

async fn send_command(
    state: &AppState,
    command: ScanCommand,
) -> Result<(StatusCode, Json<CommandAccepted>), AppError> {
    state.scanner.send(command).await?;
    tracing::info!(?command, "scan command accepted");
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted { command })))
}

async fn start_full_scan(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CommandAccepted>), AppError> {
    send_command(&state, ScanCommand::StartFullScan).await
}

async fn start_quick_scan(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CommandAccepted>), AppError> {
    send_command(&state, ScanCommand::StartQuickScan).await
}

async fn stop_scan(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CommandAccepted>), AppError> {
    send_command(&state, ScanCommand::StopScan).await
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

async fn list_shows(State(state): State<AppState>) -> Result<Json<Vec<Show>>, AppError> {
    Ok(Json(shows::load(&state.db).await?))
}

async fn reset_shows(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    shows::reset(&state.db).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct StatusUpdateRequest {
    status: WatchStatus,
}

async fn update_episode_status(
    State(state): State<AppState>,
    Path((title, season, episode)): Path<(String, u32, f64)>,
    Json(body): Json<StatusUpdateRequest>,
) -> Result<StatusCode, AppError> {
    if !episode.is_finite() {
        return Err(ApiError::BadRequest(format!("invalid episode number: {episode}")).into());
    }

    let found = shows::update_episode_status(
        &state.db,
        &title,
        season,
        EpisodeNumber(episode),
        body.status,
    )
    .await?;
    if !found {
        return Err(ApiError::NotFound(format!(
            "episode {episode} of season {season} of '{title}'"
        ))
        .into());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
struct SummaryResponse {
    totals: CollectionTotals,
    normal_series: usize,
    short_watched_series: usize,
    /// New series and episodes the current or latest scan added.
    session: MergeSummary,
    scanning: bool,
}

async fn summary(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let collection = shows::load(&state.db).await?;
    let split = categorize(&collection);

    Ok(Json(SummaryResponse {
        totals: CollectionTotals::of(&collection),
        normal_series: split.normal.len(),
        short_watched_series: split.short_watched.len(),
        session: *state.session_added.lock().await,
        scanning: state.scanner.is_scanning(),
    }))
}

// ---------------------------------------------------------------------------
// SSE events
// ---------------------------------------------------------------------------

async fn sse_events(
    State(state): State<AppState>,
) -> axum::response::Sse<
    impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
> {
    use axum::response::sse::Event;
    use std::time::Duration;

    let mut rx = state.events.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(evt) => {
                    if let Ok(data) = serde_json::to_string(&evt) {
                        yield Ok(Event::default().event(evt.name()).data(data));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default()
                        .event("error")
                        .data(format!(r#"{{"lagged":{n}}}"#)));
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    axum::response::Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
