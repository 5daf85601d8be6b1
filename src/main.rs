// src/main.rs
use axum::{extract::Extension, middleware, routing::get, Json, Router};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::env;
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod auth;
mod common;
mod logging_middleware;
mod services;

use common::{AppState, Environment};
use services::{AccountService, GitHubProvider, GoogleProvider, SessionService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // An unhandled panic means possibly-corrupted state; log it and
    // terminate rather than limping on.
    std::panic::set_hook(Box::new(|panic_info| {
        error!(panic = %panic_info, "Fatal: unhandled panic, terminating");
        std::process::abort();
    }));

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://authgate.db".to_string());
    let environment = Environment::from_env();
    info!(environment = ?environment, "Loaded environment configuration");

    let google_client_id = env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
    let google_client_secret = env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
    let google_redirect_uri = env::var("GOOGLE_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080/auth/google/callback".to_string());

    let github_client_id = env::var("GITHUB_CLIENT_ID").unwrap_or_default();
    let github_client_secret = env::var("GITHUB_CLIENT_SECRET").unwrap_or_default();
    let github_redirect_uri = env::var("GITHUB_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080/auth/github/callback".to_string());

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    // Foreign keys drive the user -> sessions/links cascade; SQLite
    // needs them switched on per connection.
    let connect_options = SqliteConnectOptions::from_str(&database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let sessions = Arc::new(SessionService::new(pool.clone()));
    info!("SessionService initialized");

    let accounts = Arc::new(AccountService::new(pool.clone()));
    info!("AccountService initialized");

    let google = Arc::new(GoogleProvider::new(
        google_client_id,
        google_client_secret,
        google_redirect_uri,
    ));
    info!("Google provider initialized");

    let github = Arc::new(GitHubProvider::new(
        github_client_id,
        github_client_secret,
        github_redirect_uri,
    ));
    info!("GitHub provider initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        db: pool,
        environment,
        sessions,
        accounts,
        google,
        github,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let app = Router::new()
        .merge(auth::auth_routes())
        .route("/health", get(health_handler))
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared.clone()))
        .layer({
            // Cookie auth needs credentialed CORS with explicit origins
            let cors_origins = env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string());

            let origins: Vec<axum::http::HeaderValue> = cors_origins
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE])
                .allow_credentials(true)
        })
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let port = env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// GET /health - liveness probe
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
