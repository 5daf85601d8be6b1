// src/common/crypto.rs
//! Token generation, hashing, and comparison primitives
//!
//! Session and CSRF-state tokens are opaque random strings. Only the
//! SHA-256 digest of a session token is ever persisted; the raw value
//! lives in the response cookie and nowhere else.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Default token size. 32 bytes = 256 bits of entropy.
pub const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically secure random token, URL-safe base64
/// encoded without padding.
pub fn generate_token(byte_length: usize) -> String {
    let mut bytes = vec![0u8; byte_length];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 digest of a token as 64 lowercase hex characters.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare two byte strings in time independent of where they first
/// differ. Length mismatch returns false up front; token length is fixed
/// and public, so the length check leaks nothing useful.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
