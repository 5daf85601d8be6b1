//! # Auth Module
//!
//! This module handles all authentication-related functionality including:
//! - OAuth login via Google and GitHub
//! - Session cookie issuance and validation
//! - CSRF state checking around the OAuth redirect dance
//! - CurrentUser extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;


pub use extractors::CurrentUser;
pub use models::User;
pub use routes::auth_routes;
