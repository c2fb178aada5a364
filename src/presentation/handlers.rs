// HTTP request handlers
use crate::domain::view::DashboardView;
use crate::presentation::app_state::AppState;
use crate::presentation::error::ApiError;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A form field that may arrive as a JSON number or as raw input text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Number(f64),
    Text(String),
}

impl FieldInput {
    fn as_text(&self) -> String {
        match self {
            FieldInput::Number(n) => n.to_string(),
            FieldInput::Text(s) => s.clone(),
        }
    }
}

/// Missing or null fields read as empty input and fail validation like blank text.
#[derive(Debug, Deserialize)]
pub struct SimulationRequest {
    #[serde(default)]
    pub interval: Option<FieldInput>,
    #[serde(default)]
    pub volatility: Option<FieldInput>,
}

fn field_text(field: &Option<FieldInput>) -> String {
    field.as_ref().map(FieldInput::as_text).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementRequest {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub id: String,
    pub view: DashboardView,
}

/// Control panel feedback; the client clears it after `clear_after_ms`.
#[derive(Debug, Serialize, PartialEq)]
pub struct StatusMessage {
    pub message: String,
    pub clear_after_ms: u64,
}

impl StatusMessage {
    fn new(message: impl Into<String>, state: &AppState) -> Self {
        Self {
            message: message.into(),
            clear_after_ms: state.status_clear_ms,
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Start a new simulated lot
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreated>) {
    let session = state.registry.create().await;
    let view = session.view().await;
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            id: session.id().to_string(),
            view,
        }),
    )
}

/// Current dashboard view
pub async fn get_view(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardView>, ApiError> {
    let session = state.registry.get(&id).await?;
    Ok(Json(session.view().await))
}

/// End a session and stop its timer
pub async fn end_session(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.registry.end(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Server-sent events: the current view, then one `view` event per tick
pub async fn stream_views(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let session = state.registry.get(&id).await?;
    let events = session
        .view_stream()
        .map(|view| Event::default().event("view").json_data(view));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// Apply new simulation parameters and restart the tick timer
pub async fn update_simulation(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SimulationRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let session = state.registry.get(&id).await?;
    session
        .update_simulation(&field_text(&request.interval), &field_text(&request.volatility))
        .await
        .map_err(|e| {
            tracing::debug!("Session {} rejected simulation update: {}", id, e);
            ApiError::invalid_config(e, state.status_clear_ms)
        })?;

    Ok(Json(StatusMessage::new("Simulation updated.", &state)))
}

/// Set or clear the announcement shown in the dashboard subtitle
pub async fn set_announcement(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<AnnouncementRequest>,
) -> Result<Json<StatusMessage>, ApiError> {
    let session = state.registry.get(&id).await?;
    session.set_announcement(&request.text).await;
    Ok(Json(StatusMessage::new("Announcement saved.", &state)))
}

/// Push a snapshot to the persistence sink without waiting for it
pub async fn push_snapshot(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<StatusMessage>), ApiError> {
    let session = state.registry.get(&id).await?;
    let snapshot = session.push_snapshot().await;
    Ok((
        StatusCode::ACCEPTED,
        Json(StatusMessage::new(
            format!("Snapshot of tick {} queued.", snapshot.tick),
            &state,
        )),
    ))
}
