//! Bearer-credential seam.

use anyhow::Result;
use async_trait::async_trait;

/// Supplies a valid bearer token for outgoing API calls.
///
/// Token issuance, refresh, and storage are the caller's concern; clients in
/// this crate only ask for a token that is valid right now.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Result<String>;
}

/// Provider wrapping a fixed, externally obtained token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}
