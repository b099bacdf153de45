use super::derived::{derive_session_state, DerivedSessionState};
use crate::protocol::RemoteSessionState;
use crate::transport::Transport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Transport-level phase of the current call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// No call
    #[default]
    Idle,
    /// `start_call` passed its guard and has not joined the room yet
    Connecting,
    /// Room joined
    Connected,
    /// Teardown in progress
    Ending,
}

/// Mutable call state, only touched while holding the controller lock
pub(crate) struct CallState {
    pub phase: LifecyclePhase,
    /// Bumped on every start and every teardown; async continuations holding an
    /// older value are stale
    pub attempt: u64,
    pub transport: Option<Arc<dyn Transport>>,
    pub audio_session_active: bool,
    pub connected_at: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub room_name: Option<String>,
    pub mic_muted: bool,
    pub transcript: String,
    pub assistant_text: String,
    pub remote_speaking: bool,
    pub remote_state: RemoteSessionState,
    pub error: Option<String>,
}

impl CallState {
    pub fn new() -> Self {
        Self {
            phase: LifecyclePhase::Idle,
            attempt: 0,
            transport: None,
            audio_session_active: false,
            connected_at: None,
            session_id: None,
            room_name: None,
            mic_muted: false,
            transcript: String::new(),
            assistant_text: String::new(),
            remote_speaking: false,
            remote_state: RemoteSessionState::Active,
            error: None,
        }
    }

    /// Back to defaults, keeping only the attempt counter
    pub fn reset(&mut self) {
        let attempt = self.attempt;
        *self = Self::new();
        self.attempt = attempt;
    }

    pub fn is_current(&self, attempt: u64) -> bool {
        self.attempt == attempt
    }

    pub fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            phase: self.phase,
            is_connecting: self.phase == LifecyclePhase::Connecting,
            is_in_call: self.phase == LifecyclePhase::Connected,
            session_id: self.session_id.clone(),
            room_name: self.room_name.clone(),
            muted: self.mic_muted,
            is_speaking: self.remote_speaking,
            transcript: self.transcript.clone(),
            assistant_message: self.assistant_text.clone(),
            remote_state: self.remote_state,
            error: self.error.clone(),
        }
    }
}

/// Read-only view of the call published to the UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallSnapshot {
    pub phase: LifecyclePhase,
    pub is_connecting: bool,
    pub is_in_call: bool,
    pub session_id: Option<String>,
    pub room_name: Option<String>,
    pub muted: bool,
    pub is_speaking: bool,
    pub transcript: String,
    pub assistant_message: String,
    pub remote_state: RemoteSessionState,
    pub error: Option<String>,
}

impl CallSnapshot {
    pub fn session_state(&self) -> DerivedSessionState {
        derive_session_state(self.is_connecting, self.is_in_call, self.remote_state)
    }
}

impl Default for CallSnapshot {
    fn default() -> Self {
        CallState::new().snapshot()
    }
}
