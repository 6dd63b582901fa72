//! Password hashing.
//!
//! Hashes are Argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
//! Verification reads the cost parameters back from the stored string, so a
//! stored hash whose costs exceed [`MAX_MEMORY_KIB`] or [`MAX_ITERATIONS`] is
//! rejected without running the KDF.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Argon2, Params};
use thiserror::Error;

const SALT_LEN: usize = 16;

/// Upper bound on the memory cost a stored hash may ask for (64 MiB).
pub const MAX_MEMORY_KIB: u32 = 64 * 1024;
/// Upper bound on the iteration count a stored hash may ask for.
pub const MAX_ITERATIONS: u32 = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("password hashing failed: {0}")]
pub struct PasswordHashError(String);

impl From<argon2::password_hash::Error> for PasswordHashError {
    fn from(err: argon2::password_hash::Error) -> Self {
        Self(err.to_string())
    }
}

/// Hash `password` with a fresh random salt and the default Argon2id costs.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt: [u8; SALT_LEN] = rand::random();
    let salt = SaltString::encode_b64(&salt)?;
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Check `password` against a stored hash. Unparseable hashes and hashes with
/// out-of-bounds costs never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    let Ok(params) = Params::try_from(&parsed) else {
        return false;
    };
    if params.m_cost() > MAX_MEMORY_KIB || params.t_cost() > MAX_ITERATIONS {
        return false;
    }
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
