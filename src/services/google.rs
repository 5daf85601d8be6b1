// src/services/google.rs
//! Google OAuth provider adapter

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{encode_query, OAuthProvider, ProviderError, UserProfile, PROVIDER_TIMEOUT_SECS};
use crate::auth::models::Provider;

const SCOPES: &str = "openid email profile";

/// Wire endpoints, overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: Option<String>,
    verified_email: Option<bool>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GoogleProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: GoogleEndpoints,
    client: Client,
}

impl GoogleProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client_id,
            client_secret,
            redirect_uri,
            endpoints: GoogleEndpoints::default(),
            client,
        }
    }

    pub fn with_endpoints(mut self, endpoints: GoogleEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ProviderError::NotConfigured);
        }
        Ok(())
    }
}

#[async_trait]
impl OAuthProvider for GoogleProvider {
    fn name(&self) -> Provider {
        Provider::Google
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", SCOPES),
            ("state", state),
            ("access_type", "online"),
            ("prompt", "select_account"),
        ];

        Ok(format!(
            "{}?{}",
            self.endpoints.authorize_url,
            encode_query(&params)
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        debug!("Exchanging authorization code with Google token endpoint");

        let resp = self
            .client
            .post(&self.endpoints.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(http_status = %status, "Google code exchange failed");
            return Err(ProviderError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(http_status = %status, "Google profile fetch failed");
            return Err(ProviderError::Profile {
                status: status.as_u16(),
                body,
            });
        }

        let info: GoogleUserInfo = resp.json().await?;

        // Absent counts as unverified; an unverified address proves
        // nothing about mailbox ownership.
        if !info.verified_email.unwrap_or(false) {
            return Err(ProviderError::UnverifiedEmail);
        }

        let email = info
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("missing email".to_string()))?;

        Ok(UserProfile {
            provider: Provider::Google,
            provider_user_id: info.id,
            email,
            name: info.name.filter(|n| !n.is_empty()),
            avatar_url: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> GoogleProvider {
        GoogleProvider::new(
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:8080/auth/google/callback".to_string(),
        )
        .with_endpoints(GoogleEndpoints {
            authorize_url: server.url("/authorize"),
            token_url: server.url("/token"),
            userinfo_url: server.url("/userinfo"),
        })
    }

    #[test]
    fn test_authorization_url_carries_state_and_credentials() {
        let provider = GoogleProvider::new(
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:8080/auth/google/callback".to_string(),
        );

        let url = provider.authorization_url("csrf-state-123").unwrap();

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("state=csrf-state-123"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fauth%2Fgoogle%2Fcallback"
        ));
    }

    #[test]
    fn test_authorization_url_requires_credentials() {
        let provider = GoogleProvider::new(String::new(), String::new(), String::new());
        let result = provider.authorization_url("state");
        assert!(matches!(result, Err(ProviderError::NotConfigured)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_exchange_code_returns_access_token() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "ya29.test-token",
                    "expires_in": 3599,
                    "token_type": "Bearer"
                }));
        });

        let token = provider(&server).exchange_code("auth-code").await.unwrap();
        assert_eq!(token, "ya29.test-token");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_exchange_code_surfaces_provider_error_body() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({"error": "invalid_grant"}));
        });

        let result = provider(&server).exchange_code("stale-code").await;
        match result {
            Err(ProviderError::Exchange { status, body }) => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("Expected exchange error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fetch_profile_normalizes_fields() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET)
                .path("/userinfo")
                .header("authorization", "Bearer ya29.test-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "id": "108123456789",
                    "email": "user@example.com",
                    "verified_email": true,
                    "name": "Test User",
                    "picture": "https://lh3.example.com/photo.jpg"
                }));
        });

        let profile = provider(&server)
            .fetch_profile("ya29.test-token")
            .await
            .unwrap();

        assert_eq!(profile.provider, Provider::Google);
        assert_eq!(profile.provider_user_id, "108123456789");
        assert_eq!(profile.email, "user@example.com");
        assert_eq!(profile.name.as_deref(), Some("Test User"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://lh3.example.com/photo.jpg")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fetch_profile_rejects_unverified_email() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(GET).path("/userinfo");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "id": "108123456789",
                    "email": "user@example.com",
                    "verified_email": false
                }));
        });

        let result = provider(&server).fetch_profile("ya29.test-token").await;
        assert!(matches!(result, Err(ProviderError::UnverifiedEmail)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_complete_flow_composes_exchange_and_profile() {
        let server = MockServer::start();
        let _token_mock = server.mock(|when, then| {
            when.method(POST).path("/token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"access_token": "ya29.flow-token"}));
        });
        let _profile_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/userinfo")
                .header("authorization", "Bearer ya29.flow-token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "id": "sub-42",
                    "email": "flow@example.com",
                    "verified_email": true
                }));
        });

        let profile = provider(&server).complete_flow("auth-code").await.unwrap();
        assert_eq!(profile.provider_user_id, "sub-42");
        assert_eq!(profile.email, "flow@example.com");
        assert_eq!(profile.name, None);
    }
}
