//! Version 1 of the HTTP API.
//!
//! Handlers are intentionally thin wrappers that validate input, drive the
//! session state machine, and return JSON-friendly payloads to the page.
//! Diagnostics go to the SQLite event log; credentials are never written
//! anywhere.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tokio::task::spawn_blocking;
use uuid::Uuid;

use crate::db::DbPool;
use crate::errors::HearthError;
use crate::logging::{log_event, EventLevel};
use crate::personas::{self, Assessment};
use crate::provider::ChatBackend;
use crate::session::{Message, SessionStore};

use super::page::INDEX_HTML;

/// Shared state injected into each handler.
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub sessions: SessionStore,
    pub backend: Arc<dyn ChatBackend>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/v1/ping", get(ping))
        .route("/api/v1/personas", get(list_personas))
        .route("/api/v1/session", post(create_session))
        .route("/api/v1/session/:id", delete(delete_session))
        .route(
            "/api/v1/session/:id/credential",
            post(submit_credential).delete(revoke_credential),
        )
        .route("/api/v1/session/:id/messages", get(list_messages))
        .route("/api/v1/session/:id/persona", post(select_persona))
        .route("/api/v1/session/:id/recommend", post(recommend_persona))
        .route("/api/v1/session/:id/chat", post(chat))
        .route("/api/v1/session/:id/clear", post(clear_chat))
        .route("/api/v1/events", get(list_events))
        .with_state(state)
}

/// Error envelope mapping the catalogue onto HTTP statuses.
pub struct ApiError(HearthError);

impl From<HearthError> for ApiError {
    fn from(err: HearthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HearthError::CredentialRejected(_) => StatusCode::UNAUTHORIZED,
            HearthError::SessionLocked => StatusCode::FORBIDDEN,
            HearthError::SessionNotFound => StatusCode::NOT_FOUND,
            HearthError::UnknownPersona(_) => StatusCode::BAD_REQUEST,
            HearthError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
            HearthError::DbUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = json!({
            "error": self.0.to_string(),
            "code": self.0.code(),
            "explain": self.0.explain(),
        });
        (status, Json(body)).into_response()
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Simple health-check endpoint for the page.
async fn ping() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "ts": OffsetDateTime::now_utc().unix_timestamp(),
    }))
}

async fn list_personas() -> Json<&'static [personas::Persona]> {
    Json(personas::PERSONAS)
}

#[derive(Serialize)]
struct SessionCreated {
    session_id: Uuid,
}

async fn create_session(State(state): State<ApiState>) -> Json<SessionCreated> {
    let session_id = state.sessions.create().await;
    record_event(
        &state.db,
        EventLevel::Info,
        "SES-0001",
        "session",
        "session created",
        json!({ "session_id": session_id }),
    );
    Json(SessionCreated { session_id })
}

/// Drop a session entirely; the page calls this when the tab goes away.
async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    if !state.sessions.remove(id).await {
        return Err(HearthError::SessionNotFound.into());
    }
    record_event(
        &state.db,
        EventLevel::Info,
        "SES-0002",
        "session",
        "session deleted",
        json!({ "session_id": id }),
    );
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct CredentialInput {
    api_key: String,
}

#[derive(Serialize)]
struct OkResponse {
    ok: bool,
}

async fn submit_credential(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CredentialInput>,
) -> Result<Json<OkResponse>, ApiError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    match session
        .submit_credential(state.backend.as_ref(), input.api_key.trim())
        .await
    {
        Ok(()) => {
            record_event(
                &state.db,
                EventLevel::Info,
                "CRD-0001",
                "credential",
                "credential accepted",
                json!({ "session_id": id }),
            );
            Ok(Json(OkResponse { ok: true }))
        }
        Err(err) => {
            record_event(
                &state.db,
                EventLevel::Warn,
                "CRD-0002",
                "credential",
                "credential rejected",
                json!({ "session_id": id, "reason": err.to_string() }),
            );
            Err(err.into())
        }
    }
}

async fn revoke_credential(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let shared = state.sessions.get(id).await?;
    shared.lock().await.revoke_credential();
    record_event(
        &state.db,
        EventLevel::Info,
        "CRD-0003",
        "credential",
        "credential revoked",
        json!({ "session_id": id }),
    );
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Serialize)]
struct SessionView {
    unlocked: bool,
    persona: &'static personas::Persona,
    messages: Vec<Message>,
}

/// Fetch the log. This is the lazy point where the opening greeting is
/// synthesized, mirroring the rerun model of the original UI.
async fn list_messages(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, ApiError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    session.ensure_greeting();
    Ok(Json(SessionView {
        unlocked: session.unlocked(),
        persona: session.persona(),
        messages: session.messages().to_vec(),
    }))
}

#[derive(Deserialize)]
struct PersonaInput {
    persona_id: String,
}

#[derive(Serialize)]
struct PersonaSwitched {
    switched: bool,
    persona: &'static personas::Persona,
}

async fn select_persona(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PersonaInput>,
) -> Result<Json<PersonaSwitched>, ApiError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let switched = session.select_persona(&input.persona_id)?;
    if switched {
        record_event(
            &state.db,
            EventLevel::Info,
            "PER-0001",
            "persona",
            "persona switched",
            json!({ "session_id": id, "persona": input.persona_id }),
        );
    }
    Ok(Json(PersonaSwitched {
        switched,
        persona: session.persona(),
    }))
}

#[derive(Deserialize)]
struct AssessmentInput {
    age_group: String,
    concern: String,
    mood: u8,
}

async fn recommend_persona(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(input): Json<AssessmentInput>,
) -> Result<Json<PersonaSwitched>, ApiError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let (persona, switched) = session.apply_recommendation(&Assessment {
        age_group: &input.age_group,
        concern: &input.concern,
        mood: input.mood,
    });
    record_event(
        &state.db,
        EventLevel::Info,
        "PER-0002",
        "persona",
        "assessment recommendation",
        json!({
            "session_id": id,
            "age_group": input.age_group,
            "concern": input.concern,
            "mood": input.mood,
            "persona": persona.id,
        }),
    );
    Ok(Json(PersonaSwitched { switched, persona }))
}

#[derive(Deserialize)]
struct ChatInput {
    content: String,
}

#[derive(Serialize)]
struct ChatOutput {
    reply: Message,
    crisis: bool,
}

async fn chat(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatOutput>, ApiError> {
    let shared = state.sessions.get(id).await?;
    let mut session = shared.lock().await;
    let outcome = session
        .send_message(state.backend.as_ref(), &input.content)
        .await?;

    if outcome.crisis {
        record_event(
            &state.db,
            EventLevel::Warn,
            "CHT-0201",
            "chat.runtime",
            "crisis message intercepted",
            json!({ "session_id": id, "persona": session.persona().id }),
        );
    } else if let Some(reason) = &outcome.generation_error {
        record_event(
            &state.db,
            EventLevel::Warn,
            "CHT-0202",
            "chat.runtime",
            "provider call failed, apology substituted",
            json!({ "session_id": id, "error": reason }),
        );
    } else {
        let preview = outcome.reply.content.chars().take(200).collect::<String>();
        record_event(
            &state.db,
            EventLevel::Info,
            "CHT-0200",
            "chat.runtime",
            "chat turn completed",
            json!({ "session_id": id, "persona": session.persona().id, "preview": preview }),
        );
    }

    Ok(Json(ChatOutput {
        reply: outcome.reply,
        crisis: outcome.crisis,
    }))
}

async fn clear_chat(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let shared = state.sessions.get(id).await?;
    shared.lock().await.clear_chat();
    Ok(Json(OkResponse { ok: true }))
}

#[derive(Deserialize)]
struct EventsQuery {
    limit: Option<usize>,
}

/// Structured runtime event surfaced for diagnostics.
#[derive(Serialize)]
pub struct RuntimeEvent {
    pub id: String,
    pub ts: i64,
    pub level: String,
    pub code: Option<String>,
    pub module: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Return recent diagnostics events, newest first.
async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<RuntimeEvent>>, ApiError> {
    let pool = state.db.clone();
    let limit = query.limit.unwrap_or(50);
    let events = spawn_blocking(move || -> Result<Vec<RuntimeEvent>, HearthError> {
        let conn = pool.get().map_err(|_| HearthError::DbUnavailable)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, ts, level, code, module, message, data FROM event_log ORDER BY ts DESC LIMIT ?1",
            )
            .map_err(|_| HearthError::DbUnavailable)?;
        let rows = stmt
            .query_map([limit as i64], |row| {
                let data_str: Option<String> = row.get(6)?;
                let data = data_str.and_then(|raw| serde_json::from_str(&raw).ok());
                Ok(RuntimeEvent {
                    id: row.get(0)?,
                    ts: row.get(1)?,
                    level: row.get(2)?,
                    code: row.get(3)?,
                    module: row.get(4)?,
                    message: row.get(5)?,
                    data,
                })
            })
            .map_err(|_| HearthError::DbUnavailable)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row.map_err(|_| HearthError::DbUnavailable)?);
        }
        Ok(events)
    })
    .await
    .map_err(|_| HearthError::DbUnavailable)??;
    Ok(Json(events))
}

/// Fire-and-forget diagnostics write. Pool checkout and the SQLite insert
/// both block, so the work runs on the blocking thread pool rather than a
/// runtime worker.
fn record_event(
    pool: &DbPool,
    level: EventLevel,
    code: &'static str,
    module: &'static str,
    message: &'static str,
    data: serde_json::Value,
) -> tokio::task::JoinHandle<()> {
    let pool = pool.clone();
    spawn_blocking(move || {
        if let Ok(conn) = pool.get() {
            let _ = log_event(&conn, level, Some(code), module, message, None, Some(data));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_migrations;
    use r2d2_sqlite::SqliteConnectionManager;

    fn memory_pool() -> DbPool {
        let mgr = SqliteConnectionManager::memory();
        let pool = r2d2::Pool::builder().max_size(1).build(mgr).unwrap();
        apply_migrations(&pool.get().unwrap()).unwrap();
        pool
    }

    #[tokio::test]
    async fn record_event_persists_a_diagnostics_row() {
        let pool = memory_pool();
        record_event(
            &pool,
            EventLevel::Info,
            "SES-0001",
            "session",
            "session created",
            json!({ "session_id": "test" }),
        )
        .await
        .unwrap();
        let conn = pool.get().unwrap();
        let (count, level): (i64, String) = conn
            .query_row("SELECT COUNT(1), MAX(level) FROM event_log", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(level, "info");
    }
}
