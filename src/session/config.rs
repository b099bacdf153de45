use serde::{Deserialize, Serialize};
use std::time::Duration;

/// First assistant line shown before the agent has said anything
pub const DEFAULT_GREETING: &str = "Hey, I'm Aletheia. Think of me as a space where your thoughts can unfold and take shape. What's on your mind?";

/// Configuration for the call controller
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CallConfig {
    /// Local-only assistant text set as soon as the session is created
    pub greeting: String,

    /// Prefix for generated room names (`<prefix>-<timestamp-base36>`)
    pub room_prefix: String,

    /// Probe backend health before requesting a session (failure is only logged)
    pub health_check: bool,

    /// Limit for the backend session request, 0 disables
    /// Default: 15 seconds
    pub session_timeout_secs: u64,

    /// Limit for joining the room, 0 disables
    /// Default: 15 seconds
    pub connect_timeout_secs: u64,

    /// Resume a paused session when an audio track is unmuted
    pub auto_resume_on_voice: bool,
}

impl CallConfig {
    pub fn session_timeout(&self) -> Option<Duration> {
        (self.session_timeout_secs > 0).then(|| Duration::from_secs(self.session_timeout_secs))
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            room_prefix: "aletheia".to_string(),
            health_check: true,
            session_timeout_secs: 15,
            connect_timeout_secs: 15,
            auto_resume_on_voice: true,
        }
    }
}
