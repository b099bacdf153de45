use anyhow::Result;

/// Identity provider capability: issues a bearer token on demand
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// `Ok(None)` means the user is not signed in
    async fn get_token(&self) -> Result<Option<String>>;
}

/// Token read from configuration or the environment
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn get_token(&self) -> Result<Option<String>> {
        Ok(self.token.clone().filter(|token| !token.trim().is_empty()))
    }
}
