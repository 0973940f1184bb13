//! Hashing primitives
//!
//! - Argon2id password hashing for login credentials
//! - Keyed NIM hashing for ballots: HMAC-SHA256 under the election secret,
//!   hex encoded. The same NIM always maps to the same digest, which is
//!   what the one-ballot-per-period check relies on.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hash a password into a PHC string (`$argon2id$...`)
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// A malformed hash is an error, a wrong password is `Ok(false)`.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Keyed hasher turning a NIM into the anonymous voter identifier
#[derive(Clone)]
pub struct NimHasher {
    key: Vec<u8>,
}

impl NimHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    pub fn hash(&self, nim: &str) -> Result<String> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).context("Invalid NIM hashing key")?;
        mac.update(nim.trim().as_bytes());
        Ok(HEXLOWER.encode(&mac.finalize().into_bytes()))
    }
}

impl std::fmt::Debug for NimHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NimHasher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("rahasia123", &hash).unwrap());
        assert!(!verify_password("salah", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_nim_hash_matches_rfc4231_vector() {
        // RFC 4231 test case 2
        let hasher = NimHasher::new("Jefe");
        assert_eq!(
            hasher.hash("what do ya want for nothing?").unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_nim_hash_is_keyed_and_stable() {
        let a = NimHasher::new("secret-a");
        let b = NimHasher::new("secret-b");

        assert_eq!(a.hash("2207411001").unwrap(), a.hash(" 2207411001 ").unwrap());
        assert_ne!(a.hash("2207411001").unwrap(), b.hash("2207411001").unwrap());
        assert_eq!(a.hash("2207411001").unwrap().len(), 64);
    }
}
