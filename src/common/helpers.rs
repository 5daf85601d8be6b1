// Helper functions for safe logging and timestamp formatting

use chrono::{DateTime, Utc};

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    if email.len() > 3 {
        let parts: Vec<&str> = email.split('@').collect();
        if parts.len() == 2 {
            format!("{}***@{}", &parts[0][..1.min(parts[0].len())], parts[1])
        } else {
            "***@***.***".to_string()
        }
    } else {
        "***@***.***".to_string()
    }
}

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// let masked = safe_token_log("3q2-8hFzR4tYvNpQxW7uKmJdScLbAgEe");
/// // Returns: "3q2-...AgEe"
/// ```
#[allow(dead_code)]
pub fn safe_token_log(token: &str) -> String {
    if token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Formats a timestamp the way SQLite's datetime('now') does, so stored
/// values compare correctly against it.
pub fn sqlite_datetime(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}
