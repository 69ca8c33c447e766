//! Opaque bearer token generation and hashing.
//!
//! A token's plaintext exists only in the response to the caller. Storage
//! keeps the SHA-256 of the plaintext, so every lookup hashes the presented
//! value and compares hashes.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Number of random bytes behind each token.
const TOKEN_ENTROPY_BYTES: usize = 16;

/// Length of an encoded plaintext token (16 bytes, unpadded base64).
pub const TOKEN_PLAINTEXT_LENGTH: usize = 22;

/// Purpose tag restricting where a token may be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    /// Bearer credential for API requests.
    Authentication,
    /// One-shot account activation.
    Activation,
}

impl TokenScope {
    /// Convert to the stored string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Authentication => "authentication",
            TokenScope::Activation => "activation",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authentication" => Ok(TokenScope::Authentication),
            "activation" => Ok(TokenScope::Activation),
            _ => Err(format!("unknown token scope: {s}")),
        }
    }
}

/// Malformed plaintext token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// No token was supplied.
    #[error("must be provided")]
    Missing,

    /// Wrong length or characters outside the URL-safe base64 alphabet.
    #[error("must be {TOKEN_PLAINTEXT_LENGTH} characters long")]
    Malformed,
}

/// A freshly issued credential.
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    /// Plaintext handed to the client exactly once.
    #[serde(rename = "token")]
    pub plaintext: String,
    /// SHA-256 of the plaintext; the only value persisted.
    #[serde(skip)]
    pub hash: Vec<u8>,
    /// Owning user.
    #[serde(skip)]
    pub user_id: i64,
    /// Where the token may be redeemed.
    #[serde(skip)]
    pub scope: TokenScope,
    /// Moment after which lookups no longer match.
    pub expiry: DateTime<Utc>,
}

impl Token {
    /// Generate a token for `user_id` that expires `ttl` from now.
    pub fn generate(user_id: i64, ttl: chrono::Duration, scope: TokenScope) -> Self {
        let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let plaintext = URL_SAFE_NO_PAD.encode(bytes);
        let hash = hash_plaintext(&plaintext);

        Self {
            plaintext,
            hash,
            user_id,
            scope,
            expiry: Utc::now() + ttl,
        }
    }
}

/// Deterministic lookup hash of a plaintext token.
pub fn hash_plaintext(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Check a presented token's shape before it is allowed near storage.
pub fn validate_plaintext(plaintext: &str) -> Result<(), TokenError> {
    if plaintext.is_empty() {
        return Err(TokenError::Missing);
    }
    if plaintext.len() != TOKEN_PLAINTEXT_LENGTH {
        return Err(TokenError::Malformed);
    }
    match URL_SAFE_NO_PAD.decode(plaintext) {
        Ok(bytes) if bytes.len() == TOKEN_ENTROPY_BYTES => Ok(()),
        _ => Err(TokenError::Malformed),
    }
}
