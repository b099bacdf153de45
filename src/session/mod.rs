//! Call session management
//!
//! This module provides the `CallController` abstraction that manages:
//! - Microphone permission and the local audio session
//! - Backend session creation and room credentials
//! - Transport connection and lifecycle event handling
//! - Inbound control messages (transcripts, speaking, pause state)
//! - The derived presentation state consumed by the UI

mod config;
mod controller;
mod derived;
mod room;
mod state;

pub use config::{CallConfig, DEFAULT_GREETING};
pub use controller::{CallCapabilities, CallController, StartOutcome};
pub use derived::{derive_session_state, DerivedSessionState, SessionStateView};
pub use room::generate_room_name;
pub use state::{CallSnapshot, LifecyclePhase};
