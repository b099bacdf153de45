use std::time::Duration;
use thiserror::Error;

/// Why a call attempt failed
///
/// The `Display` text is what the UI shows in its one-time alert.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Microphone permission is required for voice sessions")]
    PermissionDenied,

    #[error("Daily session limit reached for your plan")]
    UsageLimitReached,

    #[error("Failed to start call: no auth token available")]
    MissingToken,

    #[error("Failed to start audio session: {0:#}")]
    AudioSession(anyhow::Error),

    #[error("Failed to start call: {0:#}")]
    Backend(anyhow::Error),

    #[error("Failed to connect to session: {0:#}")]
    Transport(anyhow::Error),

    #[error("Failed to start call: {step} timed out after {timeout:?}")]
    Timeout {
        step: &'static str,
        timeout: Duration,
    },

    #[error("Connection lost: {0}")]
    Disconnected(String),
}

impl CallError {
    /// Permission problems are fixed by the user in OS settings, not by retrying
    pub fn is_permission(&self) -> bool {
        matches!(self, CallError::PermissionDenied)
    }
}
