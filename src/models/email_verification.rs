//! Email Verification Model
//!
//! Tokens mailed to new accounts as a verification link.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Email verification record
///
/// The raw token only ever exists in the email; the store keeps its SHA-256.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EmailVerification {
    /// Unique identifier for the verification record
    pub id: Uuid,

    /// Reference to the user account
    pub user_id: Uuid,

    /// SHA-256 hex digest of the token
    pub token_hash: String,

    /// Expiration timestamp for the token
    pub expires_at: DateTime<Utc>,

    /// When the token was generated
    pub created_at: DateTime<Utc>,

    /// When the token was used (if applicable)
    pub verified_at: Option<DateTime<Utc>>,
}

impl EmailVerification {
    pub fn new(user_id: Uuid, token_hash: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            expires_at,
            created_at: Utc::now(),
            verified_at: None,
        }
    }

    /// Check if the verification token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Check if the token has already been used
    pub fn is_verified(&self) -> bool {
        self.verified_at.is_some()
    }

    /// Check if this token can still be used
    pub fn is_usable(&self) -> bool {
        !self.is_expired() && !self.is_verified()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn create_test_verification() -> EmailVerification {
        EmailVerification::new(
            Uuid::new_v4(),
            "hash".to_string(),
            Utc::now() + Duration::hours(24),
        )
    }

    #[test]
    fn test_is_usable() {
        let verification = create_test_verification();
        assert!(verification.is_usable());

        let mut expired = verification.clone();
        expired.expires_at = Utc::now() - Duration::minutes(1);
        assert!(expired.is_expired());
        assert!(!expired.is_usable());

        let mut used = verification.clone();
        used.verified_at = Some(Utc::now());
        assert!(used.is_verified());
        assert!(!used.is_usable());
    }
}
