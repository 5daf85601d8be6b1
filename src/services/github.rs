// src/services/github.rs
//! GitHub OAuth provider adapter
//!
//! GitHub differs from Google on the wire: the token endpoint reports
//! failures with a 200 response carrying an `error` field, the primary
//! profile payload may omit the email address, and every API call must
//! send a User-Agent header. The email list is fetched alongside the
//! profile and the address flagged both primary and verified wins.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::provider::{encode_query, OAuthProvider, ProviderError, UserProfile, PROVIDER_TIMEOUT_SECS};
use crate::auth::models::Provider;

const SCOPES: &str = "read:user user:email";
const API_USER_AGENT: &str = "authgate";

/// Wire endpoints, overridable so tests can point at a local server.
#[derive(Debug, Clone)]
pub struct GitHubEndpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub user_url: String,
    pub emails_url: String,
}

impl Default for GitHubEndpoints {
    fn default() -> Self {
        Self {
            authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            token_url: "https://github.com/login/oauth/access_token".to_string(),
            user_url: "https://api.github.com/user".to_string(),
            emails_url: "https://api.github.com/user/emails".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    endpoints: GitHubEndpoints,
    client: Client,
}

impl GitHubProvider {
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(PROVIDER_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client_id,
            client_secret,
            redirect_uri,
            endpoints: GitHubEndpoints::default(),
            client,
        }
    }

    pub fn with_endpoints(mut self, endpoints: GitHubEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    fn ensure_configured(&self) -> Result<(), ProviderError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(ProviderError::NotConfigured);
        }
        Ok(())
    }

    async fn fetch_user(&self, access_token: &str) -> Result<GitHubUser, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoints.user_url)
            .bearer_auth(access_token)
            .header(USER_AGENT, API_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(http_status = %status, "GitHub profile fetch failed");
            return Err(ProviderError::Profile {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }

    async fn fetch_emails(&self, access_token: &str) -> Result<Vec<GitHubEmail>, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoints.emails_url)
            .bearer_auth(access_token)
            .header(USER_AGENT, API_USER_AGENT)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(http_status = %status, "GitHub email list fetch failed");
            return Err(ProviderError::Profile {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl OAuthProvider for GitHubProvider {
    fn name(&self) -> Provider {
        Provider::Github
    }

    fn authorization_url(&self, state: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        let params = [
            ("client_id", self.client_id.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", SCOPES),
            ("state", state),
        ];

        Ok(format!(
            "{}?{}",
            self.endpoints.authorize_url,
            encode_query(&params)
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        self.ensure_configured()?;

        debug!("Exchanging authorization code with GitHub token endpoint");

        let resp = self
            .client
            .post(&self.endpoints.token_url)
            .header(ACCEPT, "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(http_status = %status, "GitHub code exchange failed");
            return Err(ProviderError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        // GitHub reports bad codes with a 200 response carrying an
        // error field rather than an error status.
        let token: TokenResponse = resp.json().await?;
        if let Some(error) = token.error {
            let body = token.error_description.unwrap_or(error);
            warn!("GitHub code exchange rejected");
            return Err(ProviderError::Exchange {
                status: status.as_u16(),
                body,
            });
        }

        token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ProviderError::MalformedResponse("missing access_token".to_string()))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ProviderError> {
        let (user, emails) = tokio::try_join!(
            self.fetch_user(access_token),
            self.fetch_emails(access_token)
        )?;

        let email = emails
            .into_iter()
            .find(|e| e.primary && e.verified)
            .map(|e| e.email)
            .ok_or(ProviderError::NoVerifiedEmail)?;

        // The display name is optional on GitHub; fall back to the
        // login handle.
        let name = user
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| user.login.clone());

        Ok(UserProfile {
            provider: Provider::Github,
            provider_user_id: user.id.to_string(),
            email,
            name: Some(name),
            avatar_url: user.avatar_url.filter(|a| !a.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider(server: &MockServer) -> GitHubProvider {
        GitHubProvider::new(
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:8080/auth/github/callback".to_string(),
        )
        .with_endpoints(GitHubEndpoints {
            authorize_url: server.url("/authorize"),
            token_url: server.url("/access_token"),
            user_url: server.url("/user"),
            emails_url: server.url("/user/emails"),
        })
    }

    #[test]
    fn test_authorization_url_carries_state_and_scopes() {
        let provider = GitHubProvider::new(
            "test-client-id".to_string(),
            "test-client-secret".to_string(),
            "http://localhost:8080/auth/github/callback".to_string(),
        );

        let url = provider.authorization_url("csrf-state-456").unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=test-client-id"));
        assert!(url.contains("state=csrf-state-456"));
        assert!(url.contains("scope=read%3Auser%20user%3Aemail"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_exchange_code_rejects_error_in_success_body() {
        let server = MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(POST).path("/access_token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "error": "bad_verification_code",
                    "error_description": "The code passed is incorrect or expired."
                }));
        });

        let result = provider(&server).exchange_code("expired-code").await;
        match result {
            Err(ProviderError::Exchange { status, body }) => {
                assert_eq!(status, 200);
                assert!(body.contains("incorrect or expired"));
            }
            other => panic!("Expected exchange error, got {:?}", other),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fetch_profile_selects_primary_verified_email() {
        let server = MockServer::start();
        let _user_mock = server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "id": 583231,
                    "login": "octocat",
                    "name": "The Octocat",
                    "avatar_url": "https://avatars.example.com/u/583231"
                }));
        });
        let _emails_mock = server.mock(|when, then| {
            when.method(GET).path("/user/emails");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {"email": "spare@example.com", "primary": false, "verified": true},
                    {"email": "octocat@example.com", "primary": true, "verified": true}
                ]));
        });

        let profile = provider(&server).fetch_profile("gho_token").await.unwrap();

        assert_eq!(profile.provider, Provider::Github);
        assert_eq!(profile.provider_user_id, "583231");
        assert_eq!(profile.email, "octocat@example.com");
        assert_eq!(profile.name.as_deref(), Some("The Octocat"));
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://avatars.example.com/u/583231")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fetch_profile_requires_primary_verified_email() {
        let server = MockServer::start();
        let _user_mock = server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"id": 1, "login": "ghost"}));
        });
        let _emails_mock = server.mock(|when, then| {
            when.method(GET).path("/user/emails");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {"email": "primary@example.com", "primary": true, "verified": false},
                    {"email": "verified@example.com", "primary": false, "verified": true}
                ]));
        });

        let result = provider(&server).fetch_profile("gho_token").await;
        assert!(matches!(result, Err(ProviderError::NoVerifiedEmail)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_fetch_profile_falls_back_to_login_handle() {
        let server = MockServer::start();
        let _user_mock = server.mock(|when, then| {
            when.method(GET).path("/user");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"id": 99, "login": "nameless", "name": null}));
        });
        let _emails_mock = server.mock(|when, then| {
            when.method(GET).path("/user/emails");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {"email": "nameless@example.com", "primary": true, "verified": true}
                ]));
        });

        let profile = provider(&server).fetch_profile("gho_token").await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("nameless"));
        assert_eq!(profile.avatar_url, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_complete_flow_composes_exchange_and_profile() {
        let server = MockServer::start();
        let _token_mock = server.mock(|when, then| {
            when.method(POST).path("/access_token");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"access_token": "gho_flow", "token_type": "bearer"}));
        });
        let _user_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/user")
                .header("authorization", "Bearer gho_flow");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"id": 7, "login": "flowuser"}));
        });
        let _emails_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/user/emails")
                .header("authorization", "Bearer gho_flow");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([
                    {"email": "flow@example.com", "primary": true, "verified": true}
                ]));
        });

        let profile = provider(&server).complete_flow("auth-code").await.unwrap();
        assert_eq!(profile.provider_user_id, "7");
        assert_eq!(profile.email, "flow@example.com");
    }
}
