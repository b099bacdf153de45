use super::state::AppState;
use crate::session::{generate_room_name, CallSnapshot, DerivedSessionState, StartOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartCallRequest {
    /// Optional room name (if not provided, generate `<prefix>-<base36 time>`)
    pub room_name: Option<String>,

    /// Optional participant identity passed to the backend
    pub identity: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallStateResponse {
    #[serde(flatten)]
    pub call: CallSnapshot,
    pub session_state: DerivedSessionState,
    pub is_paused: bool,
    pub is_active: bool,
}

impl From<CallSnapshot> for CallStateResponse {
    fn from(call: CallSnapshot) -> Self {
        let session_state = call.session_state();
        Self {
            call,
            session_state,
            is_paused: session_state == DerivedSessionState::Idle,
            is_active: session_state == DerivedSessionState::Active,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionControlResponse {
    pub sent: bool,
    pub session_state: DerivedSessionState,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /call/start
/// Start a call and wait until it is connected or has failed
pub async fn start_call(
    State(state): State<AppState>,
    body: Option<Json<StartCallRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let room_name = req
        .room_name
        .unwrap_or_else(|| generate_room_name(&state.controller.config().room_prefix));

    info!("Starting call for room: {}", room_name);

    match state
        .controller
        .start_call(&room_name, req.identity.as_deref())
        .await
    {
        StartOutcome::Started => {
            let snapshot = state.controller.snapshot().await;
            (StatusCode::OK, Json(CallStateResponse::from(snapshot))).into_response()
        }
        StartOutcome::AlreadyActive => {
            let current = state.controller.snapshot().await;
            error_response(
                StatusCode::CONFLICT,
                format!(
                    "Call already in progress in room {}",
                    current.room_name.as_deref().unwrap_or("unknown")
                ),
            )
        }
        StartOutcome::Cancelled => {
            error_response(StatusCode::CONFLICT, "Call was ended before it connected")
        }
        StartOutcome::Failed(err) => {
            warn!("Call failed to start: {}", err);
            let message = err.to_string();
            // The response is the alert for this attempt
            state.controller.dismiss_error(&message).await;

            let status = if err.is_permission() {
                StatusCode::FORBIDDEN
            } else {
                StatusCode::BAD_GATEWAY
            };
            error_response(status, message)
        }
    }
}

/// POST /call/end
pub async fn end_call(State(state): State<AppState>) -> impl IntoResponse {
    state.controller.end_call().await;
    let snapshot = state.controller.snapshot().await;
    (StatusCode::OK, Json(CallStateResponse::from(snapshot)))
}

/// POST /call/mute
/// Toggle the local microphone
pub async fn toggle_mute(State(state): State<AppState>) -> impl IntoResponse {
    let before = state.controller.snapshot().await;
    if !before.is_in_call {
        return error_response(StatusCode::CONFLICT, "No call in progress");
    }

    state.controller.toggle_mute().await;
    let snapshot = state.controller.snapshot().await;
    (StatusCode::OK, Json(CallStateResponse::from(snapshot))).into_response()
}

/// POST /call/pause
pub async fn pause_session(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.session_view();
    let sent = view.pause_session().await;
    Json(SessionControlResponse {
        sent,
        session_state: view.state().await,
    })
}

/// POST /call/resume
pub async fn resume_session(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.session_view();
    let sent = view.resume_session().await;
    Json(SessionControlResponse {
        sent,
        session_state: view.state().await,
    })
}

/// GET /call/state
pub async fn get_call_state(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.controller.snapshot().await;
    Json(CallStateResponse::from(snapshot))
}

/// GET /usage
/// Today's plan usage and recent sessions
pub async fn get_usage(State(state): State<AppState>) -> impl IntoResponse {
    match &state.usage {
        Some(usage) => {
            let summary = usage.lock().await.summary();
            (StatusCode::OK, Json(summary)).into_response()
        }
        None => error_response(StatusCode::NOT_FOUND, "Usage metering is disabled"),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
