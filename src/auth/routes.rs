//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/:provider/start` - Begin the OAuth flow (google, github)
/// - `GET /auth/:provider/callback` - OAuth redirect target
/// - `GET /auth/me` - Get current user information
/// - `POST /auth/logout` - Revoke the session and clear the cookie
pub fn auth_routes() -> Router {
    Router::new()
        .route("/auth/:provider/start", get(handlers::oauth_start))
        .route("/auth/:provider/callback", get(handlers::oauth_callback))
        .route("/auth/me", get(handlers::me_handler))
        .route("/auth/logout", post(handlers::logout_handler))
}
