//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::handlers::SESSION_COOKIE;
use super::models::User;
use crate::common::{safe_email_log, ApiError, AppState};

/// One body for every authenticated-route failure. Missing cookie,
/// unknown token, and expired session are indistinguishable to the
/// caller.
pub(crate) const UNAUTHORIZED_MSG: &str = "authentication required";

/// Authenticated user extractor
///
/// Reads the session cookie, validates the bearer token against the
/// session store, and attaches the resolved user to the request.
#[derive(Debug)]
pub struct CurrentUser {
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract the Extension containing the AppState
        let Extension(state_lock): Extension<Arc<RwLock<AppState>>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let app_state = state_lock.read().await.clone();

        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("cookie parsing failed".to_string()))?;

        let raw_token = match jar.get(SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                debug!("Authentication failed: no session cookie");
                return Err(ApiError::Unauthorized(UNAUTHORIZED_MSG.to_string()));
            }
        };

        match app_state.sessions.validate(&raw_token).await {
            Ok(Some(user)) => {
                debug!(
                    user_id = %user.id,
                    email = %safe_email_log(&user.email),
                    "User authentication successful via extractor"
                );
                Ok(CurrentUser { user })
            }
            Ok(None) => {
                warn!("Authentication failed: unknown or expired session");
                Err(ApiError::Unauthorized(UNAUTHORIZED_MSG.to_string()))
            }
            Err(e) => Err(ApiError::DatabaseError(e)),
        }
    }
}
