//! Backend session API and identity capabilities
//!
//! The controller only needs two things from the outside world before it can
//! join a room: a bearer token and a short-lived session descriptor.

mod client;
mod identity;

pub use client::{BotStatus, HttpBackend, SubscriptionInfo};
pub use identity::{StaticTokenProvider, TokenProvider};

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Credentials for joining one room, issued by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescriptor {
    /// Transport URL (e.g. `wss://...` or `nats://...`)
    pub url: String,

    /// Access token for the user participant
    pub access_token: String,

    /// Room name echoed by the backend
    pub room_name: String,

    /// Opaque bot/process identifier, "unknown" when absent
    pub session_id: String,
}

/// Result of the best-effort health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn unknown() -> Self {
        Self {
            status: "unknown".to_string(),
            timestamp: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Backend capability consumed by the call controller
#[async_trait::async_trait]
pub trait SessionBackend: Send + Sync {
    /// Probe backend health. Never fails; unreachable maps to "unknown".
    async fn health_check(&self) -> HealthStatus;

    /// Create a room session for `identity`
    async fn create_session(
        &self,
        auth_token: &str,
        room_name: &str,
        identity: Option<&str>,
    ) -> Result<SessionDescriptor>;
}
