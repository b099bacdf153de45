//! Local HTTP API for UI shells driving the call
//!
//! - POST /call/start - Start a call (optional room name and identity)
//! - POST /call/end - End the call
//! - POST /call/mute - Toggle the microphone
//! - POST /call/pause, /call/resume - Ask the agent to pause or resume
//! - GET /call/state - Current call and derived session state
//! - GET /usage - Plan usage for today
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
