// src/services/sessions.rs
//! Session lifecycle: issue, validate, revoke, sweep
//!
//! A session row holds the SHA-256 hash of its bearer token and an
//! expiry. The raw token exists only in the response cookie and the
//! requester's subsequent requests. Lifecycle per session:
//! issued -> valid -> (expired | revoked), with no way back to valid.

use sqlx::SqlitePool;
use tracing::debug;

use crate::auth::models::User;
use crate::common::helpers::sqlite_datetime;
use crate::common::id_generator::generate_session_id;
use crate::common::crypto;

/// Sessions live for a fixed 7 days; no sliding renewal.
pub const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct SessionService {
    db: SqlitePool,
}

impl SessionService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a session for a user and return the raw bearer token for
    /// cookie delivery. Prior sessions for the user are left alone;
    /// multi-device login is supported by design.
    pub async fn issue(&self, user_id: &str) -> Result<String, sqlx::Error> {
        let raw_token = crypto::generate_token(crypto::TOKEN_BYTES);
        let token_hash = crypto::hash_token(&raw_token);
        let expires_at =
            sqlite_datetime(chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS));

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(generate_session_id())
        .bind(user_id)
        .bind(&token_hash)
        .bind(&expires_at)
        .execute(&self.db)
        .await?;

        debug!(user_id = %user_id, "Issued session");

        Ok(raw_token)
    }

    /// Resolve a raw bearer token to its user. Unknown hashes and
    /// expired rows both come back as None; callers cannot tell them
    /// apart, and that is deliberate. The raw token is only ever used
    /// after hashing.
    pub async fn validate(&self, raw_token: &str) -> Result<Option<User>, sqlx::Error> {
        if raw_token.is_empty() {
            return Ok(None);
        }

        let token_hash = crypto::hash_token(raw_token);

        sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.name, u.avatar_url, u.created_at, u.updated_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token_hash = ? AND s.expires_at > datetime('now')
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await
    }

    /// Delete the session matching a raw token. Revoking a nonexistent
    /// or already-expired session is a no-op.
    pub async fn revoke(&self, raw_token: &str) -> Result<(), sqlx::Error> {
        if raw_token.is_empty() {
            return Ok(());
        }

        let token_hash = crypto::hash_token(raw_token);

        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        debug!(revoked = result.rows_affected(), "Revoked session");

        Ok(())
    }

    /// Bulk-delete expired sessions. Intended for periodic external
    /// invocation; the gateway never schedules this itself.
    pub async fn sweep_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= datetime('now')")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
