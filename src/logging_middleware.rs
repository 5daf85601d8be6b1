// src/logging_middleware.rs
//! Request logging middleware
//!
//! Logs method, path, status, and latency for every request. Bodies and
//! headers stay out of the log on purpose: session tokens ride in
//! Cookie/Set-Cookie headers and login responses describe the user.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::debug;

pub async fn log_request_response(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    debug!(
        method = %method,
        path = %path,
        status = %response.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Handled request"
    );

    response
}
