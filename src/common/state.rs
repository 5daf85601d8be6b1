// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::models::Provider;
use crate::common::environment::Environment;
use crate::services::provider::OAuthProvider;
use crate::services::{AccountService, GitHubProvider, GoogleProvider, SessionService};

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub environment: Environment,
    pub sessions: Arc<SessionService>,
    pub accounts: Arc<AccountService>,
    pub google: Arc<GoogleProvider>,
    pub github: Arc<GitHubProvider>,
}

impl AppState {
    /// Resolve the adapter for a provider. New providers plug in here
    /// without touching the flow handlers.
    pub fn provider(&self, provider: Provider) -> Arc<dyn OAuthProvider> {
        match provider {
            Provider::Google => self.google.clone(),
            Provider::Github => self.github.clone(),
        }
    }
}
