//! Authentication handlers
//!
//! The flow controller: start (mint CSRF state, redirect out), callback
//! (check state, run the provider flow, reconcile, issue a session),
//! plus the authenticated /auth/me and the always-successful logout.

use axum::extract::{Extension, Path, Query};
use axum::response::Redirect;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::extractors::CurrentUser;
use super::models::{CallbackQuery, Provider, User, UserResponse};
use crate::common::crypto;
use crate::common::{safe_email_log, ApiError, AppState, Environment};
use crate::services::sessions::SESSION_TTL_DAYS;

/// Session cookie carries the raw bearer token; only its hash is stored.
pub const SESSION_COOKIE: &str = "session";
/// CSRF state cookie set on flow start, cleared on every callback.
pub const STATE_COOKIE: &str = "oauth_state";
/// The state cookie only needs to outlive the redirect dance.
const STATE_TTL_MINUTES: i64 = 10;

/// GET /auth/:provider/start
/// Mints a CSRF state token, stores it in a short-lived cookie, and
/// redirects the user-agent to the provider's authorization page.
pub async fn oauth_start(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider_name): Path<String>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), ApiError> {
    let state = state_lock.read().await.clone();

    let provider = Provider::parse(&provider_name)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown provider: {}", provider_name)))?;

    let csrf_state = crypto::generate_token(crypto::TOKEN_BYTES);
    let auth_url = state
        .provider(provider)
        .authorization_url(&csrf_state)
        .map_err(|e| login_failure(state.environment, &e))?;

    info!(provider = provider.as_str(), "Starting OAuth flow");

    let jar = jar.add(state_cookie(&csrf_state, state.environment));
    Ok((jar, Redirect::to(&auth_url)))
}

/// GET /auth/:provider/callback
/// Validates the CSRF state, completes the provider flow, reconciles
/// the profile to a user, and issues a session cookie.
pub async fn oauth_callback(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(provider_name): Path<String>,
    Query(query): Query<CallbackQuery>,
    jar: CookieJar,
) -> (CookieJar, Result<Json<serde_json::Value>, ApiError>) {
    let state = state_lock.read().await.clone();

    let stored_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    // The state cookie is single-use: cleared on every callback
    // attempt, success or failure.
    let jar = jar.remove(removal_cookie(STATE_COOKIE));

    match run_callback(&state, &provider_name, query, stored_state).await {
        Ok((raw_token, user)) => {
            let jar = jar.add(session_cookie(&raw_token, state.environment));
            let body = serde_json::json!({ "user": UserResponse::from(&user) });
            (jar, Ok(Json(body)))
        }
        Err(e) => (jar, Err(e)),
    }
}

/// The callback proper, separated so the state cookie is cleared no
/// matter where this returns.
async fn run_callback(
    state: &AppState,
    provider_name: &str,
    query: CallbackQuery,
    stored_state: Option<String>,
) -> Result<(String, User), ApiError> {
    let provider = Provider::parse(provider_name)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown provider: {}", provider_name)))?;

    // Boundary validation answers before any provider call.
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing code parameter".to_string()))?;
    let echoed_state = query
        .state
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing state parameter".to_string()))?;

    let stored_state = stored_state.ok_or_else(|| {
        warn!(provider = provider.as_str(), "Callback without state cookie");
        ApiError::BadRequest("invalid state".to_string())
    })?;

    if !crypto::constant_time_eq(echoed_state.as_bytes(), stored_state.as_bytes()) {
        warn!(provider = provider.as_str(), "Callback state mismatch");
        return Err(ApiError::BadRequest("invalid state".to_string()));
    }

    let profile = state
        .provider(provider)
        .complete_flow(code)
        .await
        .map_err(|e| login_failure(state.environment, &e))?;

    let user = state.accounts.reconcile(&profile).await?;
    let raw_token = state.sessions.issue(&user.id).await?;

    info!(
        user_id = %user.id,
        email = %safe_email_log(&user.email),
        provider = provider.as_str(),
        "User login successful"
    );

    Ok((raw_token, user))
}

/// GET /auth/me
/// Returns the current authenticated user's information
pub async fn me_handler(current_user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(&current_user.user))
}

/// POST /auth/logout
/// Revokes the session if one is presented and clears the cookie.
/// Always reports success; logging out twice is not an error.
pub async fn logout_handler(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let state = state_lock.read().await.clone();

    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = state.sessions.revoke(cookie.value()).await {
            error!(error = %e, "Failed to revoke session during logout");
        }
    }

    let jar = jar.remove(removal_cookie(SESSION_COOKIE));
    info!("User logout successful");
    (jar, Json(serde_json::json!({ "message": "Logout successful" })))
}

// ---- Cookie builders ----

pub(crate) fn session_cookie(raw_token: &str, environment: Environment) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, raw_token.to_string());
    cookie.set_http_only(true);
    cookie.set_secure(environment.cookies_secure());
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(cookie::time::Duration::days(SESSION_TTL_DAYS));
    cookie
}

pub(crate) fn state_cookie(csrf_state: &str, environment: Environment) -> Cookie<'static> {
    let mut cookie = Cookie::new(STATE_COOKIE, csrf_state.to_string());
    cookie.set_http_only(true);
    cookie.set_secure(environment.cookies_secure());
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(cookie::time::Duration::minutes(STATE_TTL_MINUTES));
    cookie
}

pub(crate) fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::from(name);
    cookie.set_path("/");
    cookie
}

fn login_failure(environment: Environment, err: &dyn std::fmt::Display) -> ApiError {
    error!(error = %err, "OAuth login failed");
    if environment.expose_error_detail() {
        ApiError::InternalServer(format!("login failed: {}", err))
    } else {
        ApiError::InternalServer("login failed".to_string())
    }
}
