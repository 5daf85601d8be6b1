// src/common/id_generator.rs
//! Crockford Base32 ID Generator
//!
//! Generates human-readable, prefixed IDs using Crockford Base32 encoding.
//! Format: PREFIX_XXXXXX (e.g., U_K7NP3X for users)
//!
//! Benefits:
//! - No ambiguous characters (excludes I, L, O, U)
//! - Case-insensitive
//! - ~1 billion combinations per entity type (32^6)
//! - Easy to read, type, and communicate verbally

use rand::Rng;

/// Crockford Base32 alphabet (excludes I, L, O, U to avoid confusion)
const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Entity type prefixes for ID generation
#[derive(Debug, Clone, Copy)]
pub enum EntityPrefix {
    /// User (U_)
    User,
    /// Session (S_)
    Session,
    /// Linked provider account (O_)
    OauthAccount,
}

impl EntityPrefix {
    /// Get the string prefix for this entity type
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::User => "U",
            EntityPrefix::Session => "S",
            EntityPrefix::OauthAccount => "O",
        }
    }
}

/// Generate a random Crockford Base32 string of specified length
fn generate_crockford_string(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..32);
            CROCKFORD_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate a prefixed ID using Crockford Base32 encoding
///
/// # Arguments
/// * `prefix` - The entity type prefix
///
/// # Returns
/// A string in format "PREFIX_XXXXXX" (e.g., "U_K7NP3X")
pub fn generate_id(prefix: EntityPrefix) -> String {
    format!("{}_{}", prefix.as_str(), generate_crockford_string(6))
}

/// Generate a User ID (U_XXXXXX)
pub fn generate_user_id() -> String {
    generate_id(EntityPrefix::User)
}

/// Generate a Session ID (S_XXXXXX)
pub fn generate_session_id() -> String {
    generate_id(EntityPrefix::Session)
}

/// Generate an OauthAccount ID (O_XXXXXX)
pub fn generate_oauth_account_id() -> String {
    generate_id(EntityPrefix::OauthAccount)
}
