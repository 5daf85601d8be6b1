// src/services/provider.rs
//! Shared contract for OAuth identity providers
//!
//! Each provider knows how to build an authorization URL, exchange an
//! authorization code for an access token, and normalize its profile
//! response into a [`UserProfile`]. The flow handlers only ever call
//! [`OAuthProvider::complete_flow`].

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::models::Provider;

/// Outbound provider calls are bounded; a timeout is an exchange
/// failure, never a retry (authorization codes are single-use).
pub const PROVIDER_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider not configured")]
    NotConfigured,

    #[error("code exchange failed with status {status}: {body}")]
    Exchange { status: u16, body: String },

    #[error("profile fetch failed with status {status}: {body}")]
    Profile { status: u16, body: String },

    #[error("provider reported email as unverified")]
    UnverifiedEmail,

    #[error("no verified email on the provider account")]
    NoVerifiedEmail,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Provider profile normalized into a common shape
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub provider: Provider,
    pub provider_user_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    fn name(&self) -> Provider;

    /// Build the provider's authorization URL carrying the CSRF state.
    fn authorization_url(&self, state: &str) -> Result<String, ProviderError>;

    /// Exchange an authorization code for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError>;

    /// Fetch and normalize the profile for an access token.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError>;

    /// Exchange the code, then fetch the profile. The only entry point
    /// the flow handlers need.
    async fn complete_flow(&self, code: &str) -> Result<UserProfile, ProviderError> {
        let access_token = self.exchange_code(code).await?;
        self.fetch_profile(&access_token).await
    }
}

/// Build the query string for an authorization URL.
pub(crate) fn encode_query(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}
