// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Only drop tables if RESET_DB environment variable is set to "true"
    // This prevents data loss on server restarts
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("Dropped old tables");
    }

    create_auth_tables(pool).await?;
    create_indexes(pool).await?;

    info!("Database migration completed");

    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Drop tables in reverse dependency order
    let tables = vec!["sessions", "oauth_accounts", "users"];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_auth_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Users table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT UNIQUE NOT NULL,
            name TEXT,
            avatar_url TEXT,
            created_at TEXT DEFAULT (datetime('now')),
            updated_at TEXT DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Linked provider identities. One external identity maps to at most
    // one user, enforced by the (provider, provider_user_id) constraint.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS oauth_accounts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            provider_user_id TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            UNIQUE(provider, provider_user_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Sessions store only the SHA-256 hash of the bearer token, never
    // the raw value.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            token_hash TEXT UNIQUE NOT NULL,
            expires_at TEXT NOT NULL,
            created_at TEXT DEFAULT (datetime('now')),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = vec![
        "CREATE INDEX IF NOT EXISTS idx_oauth_accounts_user_id ON oauth_accounts(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id)",
        // Expiry sweep scans by expires_at
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    ];

    for index in indexes {
        sqlx::query(index).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database")
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.expect("Migrations failed");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"users"));
        assert!(names.contains(&"oauth_accounts"));
        assert!(names.contains(&"sessions"));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.expect("First run failed");
        run_migrations(&pool).await.expect("Second run failed");
    }

    #[tokio::test]
    async fn test_provider_identity_is_unique() {
        let pool = memory_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO users (id, email) VALUES ('U_1', 'a@x.com')")
            .execute(&pool)
            .await
            .unwrap();

        sqlx::query(
            "INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id) \
             VALUES ('O_1', 'U_1', 'google', 'sub-1')",
        )
        .execute(&pool)
        .await
        .unwrap();

        let duplicate = sqlx::query(
            "INSERT INTO oauth_accounts (id, user_id, provider, provider_user_id) \
             VALUES ('O_2', 'U_1', 'google', 'sub-1')",
        )
        .execute(&pool)
        .await;

        match duplicate {
            Err(sqlx::Error::Database(db)) => assert!(db.is_unique_violation()),
            other => panic!("Expected unique violation, got {:?}", other),
        }
    }
}
