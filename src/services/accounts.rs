// src/services/accounts.rs
//! Identity reconciliation
//!
//! Maps an incoming provider profile to exactly one local user, inside
//! a single transaction: a known provider link wins, then an existing
//! account with the same email gets a new link, and only then is a new
//! account created. The email-based merge trusts the provider's
//! verified-email claim as proof the same person owns the mailbox; the
//! adapters reject unverified addresses before a profile reaches this
//! code.

use sqlx::SqlitePool;
use tracing::{debug, info};

use super::provider::UserProfile;
use crate::auth::models::{OauthAccount, User};
use crate::common::helpers::safe_email_log;
use crate::common::id_generator::{generate_oauth_account_id, generate_user_id};

#[derive(Debug, Clone)]
pub struct AccountService {
    db: SqlitePool,
}

impl AccountService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Resolve a provider profile to one user, creating the user and/or
    /// the provider link as needed. Runs as one transaction; any
    /// failure rolls back entirely, so there is never a user without
    /// its link or an orphaned link. Concurrent first logins for the
    /// same identity are backstopped by the unique constraints, which
    /// surface as a unique-violation error.
    pub async fn reconcile(&self, profile: &UserProfile) -> Result<User, sqlx::Error> {
        let mut tx = self.db.begin().await?;

        let link: Option<OauthAccount> = sqlx::query_as(
            "SELECT * FROM oauth_accounts WHERE provider = ? AND provider_user_id = ?",
        )
        .bind(profile.provider.as_str())
        .bind(&profile.provider_user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let user = match link {
            Some(link) => {
                debug!(
                    provider = profile.provider.as_str(),
                    "Found existing provider link"
                );

                let mut user: User = sqlx::query_as("SELECT * FROM users WHERE id = ?")
                    .bind(&link.user_id)
                    .fetch_one(&mut *tx)
                    .await?;

                // The provider may report a newer name or avatar.
                let name = profile.name.as_deref().filter(|n| !n.is_empty());
                let avatar_url = profile.avatar_url.as_deref().filter(|a| !a.is_empty());

                if name.is_some() || avatar_url.is_some() {
                    let new_name = name.map(str::to_string).or_else(|| user.name.clone());
                    let new_avatar = avatar_url
                        .map(str::to_string)
                        .or_else(|| user.avatar_url.clone());

                    sqlx::query(
                        "UPDATE users SET name = ?, avatar_url = ?, updated_at = datetime('now') \
                         WHERE id = ?",
                    )
                    .bind(&new_name)
                    .bind(&new_avatar)
                    .bind(&user.id)
                    .execute(&mut *tx)
                    .await?;

                    user.name = new_name;
                    user.avatar_url = new_avatar;
                }

                user
            }
            None => {
                let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
                    .bind(&profile.email)
                    .fetch_optional(&mut *tx)
                    .await?;

                let user = match existing {
                    Some(user) => {
                        // Same mailbox reached through a new provider:
                        // link it to the account that already owns the
                        // email instead of creating a second account.
                        info!(
                            user_id = %user.id,
                            email = %safe_email_log(&user.email),
                            provider = profile.provider.as_str(),
                            "Linking additional provider to existing account"
                        );
                        user
                    }
                    None => {
                        let id = generate_user_id();
                        info!(
                            user_id = %id,
                            email = %safe_email_log(&profile.email),
                            provider = profile.provider.as_str(),
                            "Creating new user account"
                        );

                        sqlx::query(
                            "INSERT INTO users (id, email, name, avatar_url) VALUES (?, ?, ?, ?)",
                        )
                        .bind(&id)
                        .bind(&profile.email)
                        .bind(profile.name.as_deref())
                        .bind(profile.avatar_url.as_deref())
                        .execute(&mut *tx)
                        .await?;

                        sqlx::query_as("SELECT * FROM users WHERE id = ?")
                            .bind(&id)
                            .fetch_one(&mut *tx)
                            .await?
                    }
                };

                sqlx::query(
                    "INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id) \
                     VALUES (?, ?, ?, ?)",
                )
                .bind(generate_oauth_account_id())
                .bind(&user.id)
                .bind(profile.provider.as_str())
                .bind(&profile.provider_user_id)
                .execute(&mut *tx)
                .await?;

                user
            }
        };

        tx.commit().await?;

        Ok(user)
    }
}
