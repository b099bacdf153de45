//! Control protocol spoken over the room data channel
//!
//! Small JSON messages tagged by a `type` field:
//! - `mute` - local microphone state mirrored to the agent
//! - `session_control` - pause/resume requests
//! - `session_state_change` - authoritative pause state from the agent
//! - `transcript` - user and assistant transcript lines
//! - `speaking` - remote speaking indicator

pub mod messages;

pub use messages::{
    ControlMessage, DecodeError, RemoteSessionState, SessionAction, TranscriptRole,
};
