//! Credential and token primitives.
//!
//! Password hashing uses Argon2 with per-hash random salts. Session and
//! reset tokens are 32 random bytes, handed out hex-encoded; only their
//! SHA-256 hash is persisted.

pub mod reset;
pub mod sessions;

pub use reset::PasswordResetManager;
pub use sessions::{SessionManager, SignedIn};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Failures surfaced by the session and password reset managers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email and wrong password collapse into this single variant.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    DuplicateIdentity,
    /// Expired, already redeemed, and unknown reset tokens are reported
    /// uniformly.
    #[error("reset token is invalid or expired")]
    TokenExpiredOrUsed,
    #[error("credential hashing failed")]
    Hashing,
    #[error("storage unavailable: {0}")]
    Storage(#[from] sqlx::Error),
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash. Malformed hashes verify as false.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random bearer token
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
