use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Application-level session state pushed by the remote agent.
///
/// Orthogonal to the transport connection: an `Idle` session is paused while
/// the room stays connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteSessionState {
    #[default]
    Active,
    Idle,
}

/// Pause/resume request sent to the remote agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Pause,
    Resume,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionAction::Pause => write!(f, "pause"),
            SessionAction::Resume => write!(f, "resume"),
        }
    }
}

/// Who spoke a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptRole {
    User,
    Assistant,
}

/// Control message exchanged over the room data channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Local microphone mute mirrored to the remote agent
    Mute { muted: bool },

    /// Request the remote agent to pause or resume the conversation
    SessionControl { action: SessionAction },

    /// Authoritative session state pushed by the remote agent
    SessionStateChange { state: RemoteSessionState },

    /// Latest transcript line for either side of the conversation
    Transcript { role: TranscriptRole, text: String },

    /// Whether the remote agent is currently speaking
    Speaking { speaking: bool },

    /// Any `type` this client does not know about
    #[serde(other)]
    Unrecognized,
}

/// Failure to decode an inbound control payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("payload is not a valid control message: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl ControlMessage {
    /// Serialize to the UTF-8 JSON bytes sent as a data packet
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        if matches!(self, ControlMessage::Unrecognized) {
            anyhow::bail!("unrecognized control messages cannot be encoded");
        }

        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a data packet received from the room
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(payload)?;
        Ok(serde_json::from_str(text)?)
    }

    /// Discriminator used on the wire, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            ControlMessage::Mute { .. } => "mute",
            ControlMessage::SessionControl { .. } => "session_control",
            ControlMessage::SessionStateChange { .. } => "session_state_change",
            ControlMessage::Transcript { .. } => "transcript",
            ControlMessage::Speaking { .. } => "speaking",
            ControlMessage::Unrecognized => "unrecognized",
        }
    }
}
