//! Security Utilities
//!
//! Password hashing, opaque tokens for links and grants, and the response
//! headers every endpoint sends.

use bcrypt::BcryptError;
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// bcrypt cost used unless `BCRYPT_COST` overrides it
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Headers added to every response by the security middleware
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "no-referrer"),
    ("cache-control", "no-store"),
    ("strict-transport-security", "max-age=63072000; includeSubDomains"),
];

/// Alphanumeric token for verification links and reset grants
pub fn random_token(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password, password_hash)
}

/// Hex SHA-256; tokens are only stored in this form
pub fn sha256_hex(secret: &str) -> String {
    Sha256::digest(secret.as_bytes())
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

/// Compares two secrets without short-circuiting on the first difference
pub fn secrets_equal(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |diff, (x, y)| diff | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_shape() {
        let token = random_token(48);
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(token, random_token(48));
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hashed = hash_password("SecurePass1!", 4).unwrap();
        assert_ne!(hashed, "SecurePass1!");
        assert!(verify_password("SecurePass1!", &hashed).unwrap());
        assert!(!verify_password("securepass1!", &hashed).unwrap());
    }

    #[test]
    fn test_sha256_hex_known_digest() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_secrets_equal() {
        assert!(secrets_equal("4821", "4821"));
        assert!(!secrets_equal("4821", "4822"));
        assert!(!secrets_equal("4821", "48210"));
        assert!(secrets_equal("", ""));
    }

    #[test]
    fn test_security_header_names_are_lowercase() {
        assert!(SECURITY_HEADERS
            .iter()
            .all(|(name, _)| name.chars().all(|c| !c.is_ascii_uppercase())));
    }
}
