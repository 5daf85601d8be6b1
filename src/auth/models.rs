//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Supported identity providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Github,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Github => "github",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "google" => Some(Provider::Google),
            "github" => Some(Provider::Github),
            _ => None,
        }
    }
}

/// User database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// Linked provider identity database model
#[derive(FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct OauthAccount {
    pub id: String,
    pub user_id: String,
    pub provider: String,
    pub provider_user_id: String,
    pub created_at: Option<String>,
}

/// User payload returned by /auth/me and the callback response
#[derive(Serialize, Debug)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: Option<String>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Query parameters on the OAuth callback. Both must be present and
/// non-empty; validation happens in the handler so the responses match
/// the rest of the error surface.
#[derive(Deserialize, Debug, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}
