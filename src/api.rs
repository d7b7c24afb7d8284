use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::constants::DISCLAIMER;
use crate::credential::Credential;
use crate::domain::{AnalysisTarget, AnalysisTargetKind, TargetPayload};
use crate::error::SessionError;
use crate::session::{AnalysisEngine, SessionEvent, SessionHandle, SessionId, SessionState};

pub struct AppState {
    pub engine: AnalysisEngine,
    pub config: AppConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/credential",
            get(get_credential).put(put_credential).delete(delete_credential),
        )
        .route("/sessions", post(open_session))
        .route("/sessions/{id}", get(get_session).delete(close_session))
        .route("/sessions/{id}/events", post(dispatch_event))
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>) -> std::io::Result<()> {
    let bind_addr = state.config.server.bind_addr.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("🌐 [API] Server listening on {}", bind_addr);
    axum::serve(listener, app).await
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn session_error_response(err: SessionError) -> Response {
    match err {
        SessionError::UnknownSession(id) => {
            error_response(StatusCode::NOT_FOUND, format!("unknown session {}", id))
        }
        SessionError::Validation(v) => error_response(StatusCode::UNPROCESSABLE_ENTITY, v.user_message()),
    }
}

#[derive(Serialize)]
struct SessionView {
    session_id: SessionId,
    kind: AnalysisTargetKind,
    id: String,
    headline: String,
    summary: Option<String>,
    state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    disclaimer: Option<&'static str>,
}

impl SessionView {
    fn new(handle: &SessionHandle, state: SessionState) -> Self {
        let target = handle.target();
        let disclaimer = matches!(state, SessionState::Succeeded { .. }).then_some(DISCLAIMER);
        Self {
            session_id: handle.id(),
            kind: target.kind(),
            id: target.id().to_string(),
            headline: target.headline(),
            summary: target.summary(),
            state,
            disclaimer,
        }
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_credential(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "configured": state.engine.credentials().is_configured() }))
}

#[derive(Deserialize)]
struct CredentialBody {
    api_key: String,
}

async fn put_credential(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CredentialBody>,
) -> Response {
    match Credential::new(body.api_key) {
        Ok(credential) => {
            state.engine.credentials().set(credential);
            Json(json!({ "status": "saved" })).into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.user_message()),
    }
}

async fn delete_credential(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.engine.credentials().clear();
    Json(json!({ "status": "cleared" }))
}

#[derive(Deserialize)]
struct OpenSessionBody {
    kind: AnalysisTargetKind,
    id: String,
    #[serde(default)]
    payload: Option<Value>,
}

async fn open_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OpenSessionBody>,
) -> Response {
    let mut target = match AnalysisTarget::new(body.kind, body.id) {
        Ok(target) => target,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Some(raw) = body.payload {
        match TargetPayload::from_value(body.kind, raw) {
            Ok(payload) => target = target.with_payload(payload),
            Err(e) => {
                warn!("🌐 [API] Rejected {} payload: {}", body.kind, e);
                return error_response(StatusCode::BAD_REQUEST, format!("invalid payload: {}", e));
            }
        }
    }

    let handle = state.engine.open_session(target);
    let view = SessionView::new(&handle, SessionState::Idle);
    (StatusCode::CREATED, Json(view)).into_response()
}

async fn get_session(State(state): State<Arc<AppState>>, Path(id): Path<SessionId>) -> Response {
    let Some(handle) = state.engine.find(id) else {
        return session_error_response(SessionError::UnknownSession(id));
    };
    match state.engine.state(&handle) {
        Ok(session_state) => Json(SessionView::new(&handle, session_state)).into_response(),
        Err(e) => session_error_response(e),
    }
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventBody {
    RequestAnalysis,
    SubmitFeedback { feedback: String },
    Reset,
}

impl From<EventBody> for SessionEvent {
    fn from(body: EventBody) -> Self {
        match body {
            EventBody::RequestAnalysis => SessionEvent::RequestAnalysis,
            EventBody::SubmitFeedback { feedback } => SessionEvent::SubmitFeedback(feedback),
            EventBody::Reset => SessionEvent::Reset,
        }
    }
}

async fn dispatch_event(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
    Json(body): Json<EventBody>,
) -> Response {
    let Some(handle) = state.engine.find(id) else {
        return session_error_response(SessionError::UnknownSession(id));
    };
    match state.engine.dispatch(&handle, body.into()) {
        Ok(session_state) => Json(SessionView::new(&handle, session_state)).into_response(),
        Err(e) => session_error_response(e),
    }
}

async fn close_session(State(state): State<Arc<AppState>>, Path(id): Path<SessionId>) -> Response {
    match state.engine.find(id) {
        Some(handle) if state.engine.close_session(&handle) => StatusCode::NO_CONTENT.into_response(),
        _ => session_error_response(SessionError::UnknownSession(id)),
    }
}
