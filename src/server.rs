//! HTTP surface: note ingestion, note listing, and chat.

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::calendar::CalendarClient;
use crate::chat::{ConversationTurn, Orchestrator};
use crate::classify::Classifier;
use crate::record::StoredRecord;
use crate::router::route;
use crate::store::NoteStore;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
    pub calendar: Arc<dyn CalendarClient>,
    pub store: Arc<NoteStore>,
    pub orchestrator: Arc<Orchestrator>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/notes", post(create_note).get(list_notes))
        .route("/v1/chat", post(chat))
        .with_state(state)
}

pub async fn serve(state: AppState, bind_addr: &str) -> Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct NoteRequest {
    text: String,
    created_at: Option<String>,
}

/// Ingest one note: classify, fire the calendar side effect when the record
/// calls for one, persist, then acknowledge. The calendar call may fail
/// without blocking the note; a classification transport failure rejects it.
async fn create_note(
    State(state): State<AppState>,
    Json(payload): Json<NoteRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let text = payload.text.trim();
    if text.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "text must not be empty".to_string()));
    }

    let now = Local::now().fixed_offset();
    let record = state.classifier.classify(text, now).await.map_err(|e| {
        tracing::error!("Classification failed: {:#}", e);
        (
            StatusCode::BAD_GATEWAY,
            "classification backend unavailable".to_string(),
        )
    })?;

    if let Some(event) = route(text, &record) {
        match state.calendar.create_event(&event).await {
            Ok(link) => tracing::info!("Created calendar event: {}", link),
            Err(e) => tracing::error!("Calendar event creation failed: {:#}", e),
        }
    }

    let row = StoredRecord {
        text: text.to_string(),
        created_at: payload.created_at,
        received_at: now.to_rfc3339(),
        item_type: record.item_type.as_str().to_string(),
        time_bucket: record.time_bucket.to_wire(),
        category: record.category.clone(),
    };
    state.store.append(&row).map_err(internal_error)?;

    Ok(Json(json!({ "ok": true, "record": record })))
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<usize>,
}

fn clamp_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

async fn list_notes(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let rows = state
        .store
        .recent(clamp_limit(params.limit))
        .map_err(internal_error)?;
    Ok(Json(json!({ "notes": rows })))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    #[serde(default)]
    history: Vec<ConversationTurn>,
    prompt: String,
}

async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if payload.prompt.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "prompt must not be empty".to_string(),
        ));
    }

    let reply = state
        .orchestrator
        .respond(&payload.history, &payload.prompt)
        .await;
    Ok(Json(json!({ "reply": reply })))
}

fn internal_error(e: anyhow::Error) -> (StatusCode, String) {
    tracing::error!("Internal error: {:#}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
}
