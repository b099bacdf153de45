use crate::session::CallConfig;
use crate::usage::Plan;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub call: CallConfig,
    #[serde(default)]
    pub usage: UsageConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    /// Bearer token for the session API; usually supplied via `ALETHEIA__BACKEND__AUTH_TOKEN`
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Allow microphone capture on hosts without a permission prompt
    #[serde(default = "default_true")]
    pub microphone_allowed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageConfig {
    /// Plan used until the backend subscription has been fetched
    #[serde(default)]
    pub plan: Plan,
    /// Skip plan limits entirely
    #[serde(default)]
    pub unmetered: bool,
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("ALETHEIA").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
