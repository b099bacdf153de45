use super::controller::CallController;
use crate::protocol::{RemoteSessionState, SessionAction};
use serde::{Deserialize, Serialize};

/// Presentation state of the session, recomputed on every read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedSessionState {
    Connecting,
    Active,
    Idle,
    Disconnected,
}

/// Map transport flags and the remote pause state to one presentation state.
///
/// `remote` is only consulted while in a call.
pub fn derive_session_state(
    is_connecting: bool,
    is_in_call: bool,
    remote: RemoteSessionState,
) -> DerivedSessionState {
    if is_connecting {
        return DerivedSessionState::Connecting;
    }
    if !is_in_call {
        return DerivedSessionState::Disconnected;
    }
    match remote {
        RemoteSessionState::Active => DerivedSessionState::Active,
        RemoteSessionState::Idle => DerivedSessionState::Idle,
    }
}

/// Pause/resume controls gated on the derived state
#[derive(Clone)]
pub struct SessionStateView {
    controller: CallController,
}

impl SessionStateView {
    pub fn new(controller: CallController) -> Self {
        Self { controller }
    }

    pub async fn state(&self) -> DerivedSessionState {
        self.controller.snapshot().await.session_state()
    }

    pub async fn is_paused(&self) -> bool {
        self.state().await == DerivedSessionState::Idle
    }

    pub async fn is_active(&self) -> bool {
        self.state().await == DerivedSessionState::Active
    }

    /// Ask the agent to pause. Returns false without sending unless active.
    pub async fn pause_session(&self) -> bool {
        if self.state().await != DerivedSessionState::Active {
            return false;
        }
        self.controller
            .request_session_action(SessionAction::Pause)
            .await
    }

    /// Ask the agent to resume. Returns false without sending unless paused.
    pub async fn resume_session(&self) -> bool {
        if self.state().await != DerivedSessionState::Idle {
            return false;
        }
        self.controller
            .request_session_action(SessionAction::Resume)
            .await
    }
}
