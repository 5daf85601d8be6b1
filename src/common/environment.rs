// src/common/environment.rs
//! Deployment environment flag
//!
//! Controls the cookie `Secure` attribute and how much error detail the
//! OAuth callback exposes. Anything that is not explicitly production is
//! treated as development.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    pub fn from_env() -> Self {
        let name = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        Self::from_name(&name)
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Cookies carry `Secure` only in production so local HTTP works.
    pub fn cookies_secure(&self) -> bool {
        self.is_production()
    }

    /// Login failures include the underlying cause outside production.
    pub fn expose_error_detail(&self) -> bool {
        !self.is_production()
    }
}
