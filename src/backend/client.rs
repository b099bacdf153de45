use super::{HealthStatus, SessionBackend, SessionDescriptor};
use crate::usage::Plan;
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Body of `POST /connect-livekit`
#[derive(Debug, Serialize)]
struct ConnectRequest<'a> {
    room: &'a str,
    identity: String,
}

/// Response of `POST /connect-livekit`
#[derive(Debug, Deserialize)]
struct ConnectResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    room_url: Option<String>,
    #[serde(default)]
    room_name: Option<String>,
    #[serde(default)]
    user_token: Option<String>,
    /// Older backends only send `token`
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    bot_pid: Option<serde_json::Value>,
}

impl ConnectResponse {
    fn into_descriptor(self, requested_room: &str) -> Result<SessionDescriptor> {
        let url = self
            .room_url
            .filter(|url| !url.is_empty())
            .context("No room URL provided by backend")?;

        let access_token = self
            .user_token
            .filter(|token| !token.is_empty())
            .or(self.token.filter(|token| !token.is_empty()))
            .context("No room access token provided by backend")?;

        let session_id = match self.bot_pid {
            Some(serde_json::Value::Number(pid)) => pid.to_string(),
            Some(serde_json::Value::String(pid)) if !pid.is_empty() => pid,
            _ => "unknown".to_string(),
        };

        Ok(SessionDescriptor {
            url,
            access_token,
            room_name: self
                .room_name
                .unwrap_or_else(|| requested_room.to_string()),
            session_id,
        })
    }
}

/// Bot process status from `GET /status/{pid}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStatus {
    pub bot_id: u64,
    /// "running" or "finished"
    pub status: String,
    #[serde(default)]
    pub room: Option<String>,
}

/// Billing subscription of the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub plan: Plan,
    pub status: String,
    pub expires_at: Option<String>,
}

impl SubscriptionInfo {
    fn none() -> Self {
        Self {
            plan: Plan::None,
            status: "none".to_string(),
            expires_at: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubscriptionResponse {
    #[serde(default)]
    has_subscription: Option<bool>,
    #[serde(default)]
    plan: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

/// HTTP client for the session backend
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the bot serving a session is still running
    pub async fn bot_status(&self, bot_pid: &str) -> Result<BotStatus> {
        let url = format!("{}/status/{}", self.base_url, bot_pid);
        info!("Checking bot status: {}", bot_pid);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach backend")?;

        if !response.status().is_success() {
            anyhow::bail!("Status check failed: {}", response.status());
        }

        response
            .json::<BotStatus>()
            .await
            .context("Invalid bot status response")
    }

    /// Fetch the user's billing subscription. An expired token yields plan `none`.
    pub async fn subscription(&self, auth_token: &str) -> Result<SubscriptionInfo> {
        let url = format!("{}/api/v1/billing/me/subscription", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(auth_token)
            .send()
            .await
            .context("Failed to reach backend")?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Subscription fetch rejected: invalid token");
            return Ok(SubscriptionInfo::none());
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Subscription fetch failed: HTTP {}: {}", status, body);
        }

        let data: SubscriptionResponse = response
            .json()
            .await
            .context("Invalid subscription response")?;

        let has_subscription = data
            .has_subscription
            .unwrap_or_else(|| data.plan.as_deref().is_some_and(|plan| plan != "none"));
        let plan = if has_subscription {
            data.plan.as_deref().map(Plan::from_name).unwrap_or(Plan::None)
        } else {
            Plan::None
        };

        Ok(SubscriptionInfo {
            plan,
            status: data.status.unwrap_or_else(|| "none".to_string()),
            expires_at: data.expires_at,
        })
    }
}

#[async_trait::async_trait]
impl SessionBackend for HttpBackend {
    async fn health_check(&self) -> HealthStatus {
        let url = format!("{}/health", self.base_url);

        let response = match self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                warn!("Health check failed: {}", response.status());
                return HealthStatus::unknown();
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                return HealthStatus::unknown();
            }
        };

        response
            .json::<HealthStatus>()
            .await
            .unwrap_or_else(|_| HealthStatus::unknown())
    }

    async fn create_session(
        &self,
        auth_token: &str,
        room_name: &str,
        identity: Option<&str>,
    ) -> Result<SessionDescriptor> {
        if auth_token.is_empty() {
            anyhow::bail!("Missing auth token for session request");
        }

        let url = format!("{}/connect-livekit", self.base_url);
        info!("Requesting session for room {} from {}", room_name, url);

        let body = ConnectRequest {
            room: room_name,
            identity: identity
                .map(str::to_string)
                .unwrap_or_else(|| format!("user-{}", uuid::Uuid::new_v4())),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(auth_token)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to reach backend")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Session request failed {}: {}", status, body);
            anyhow::bail!("Connection Error: {} - {}", status.as_u16(), body);
        }

        let data: ConnectResponse = response
            .json()
            .await
            .context("Invalid session response")?;

        if let Some(status) = &data.status {
            info!("Session created (status={})", status);
        }

        data.into_descriptor(room_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ConnectResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_descriptor_prefers_user_token() {
        let descriptor = parse(
            r#"{"status":"ok","room_url":"wss://rtc.example","room_name":"aletheia-abc",
                "bot_token":"bot","user_token":"user","token":"legacy","bot_pid":4242}"#,
        )
        .into_descriptor("aletheia-abc")
        .unwrap();

        assert_eq!(descriptor.url, "wss://rtc.example");
        assert_eq!(descriptor.access_token, "user");
        assert_eq!(descriptor.room_name, "aletheia-abc");
        assert_eq!(descriptor.session_id, "4242");
    }

    #[test]
    fn test_descriptor_falls_back_to_legacy_token() {
        let descriptor = parse(r#"{"room_url":"wss://rtc.example","token":"legacy"}"#)
            .into_descriptor("requested")
            .unwrap();

        assert_eq!(descriptor.access_token, "legacy");
        assert_eq!(descriptor.room_name, "requested");
        assert_eq!(descriptor.session_id, "unknown");
    }

    #[test]
    fn test_descriptor_requires_url_and_token() {
        assert!(parse(r#"{"user_token":"user"}"#)
            .into_descriptor("room")
            .is_err());
        assert!(parse(r#"{"room_url":"wss://rtc.example","user_token":""}"#)
            .into_descriptor("room")
            .is_err());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let backend = HttpBackend::new("https://api.example.com/");
        assert_eq!(backend.base_url(), "https://api.example.com");
    }
}
