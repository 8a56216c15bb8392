//! Password Reset Models
//!
//! The short-lived 4-digit code mailed on "forgot password", and the
//! single-use grant issued once that code is verified.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::utils::otp::{codes_match, Countdown};

/// Live reset code for an email address; at most one exists per email
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetCode {
    /// Normalized email the code was issued to (the record key)
    pub email: String,

    /// 4-digit numeric code
    pub code: String,

    /// When the code was issued
    pub created_at: DateTime<Utc>,

    /// Failed verification attempts against this code
    pub attempts: i32,
}

impl PasswordResetCode {
    pub fn new(email: String, code: String, created_at: DateTime<Utc>) -> Self {
        Self {
            email,
            code,
            created_at,
            attempts: 0,
        }
    }

    /// Remaining lifetime of the code at `now`
    pub fn countdown(&self, window_secs: u32, now: DateTime<Utc>) -> Countdown {
        Countdown::for_issued_at(self.created_at, now, window_secs)
    }

    /// Check if the code has outlived its window
    pub fn is_expired(&self, window_secs: u32, now: DateTime<Utc>) -> bool {
        self.countdown(window_secs, now).is_finished()
    }

    /// Check if the maximum number of failed attempts has been reached
    pub fn has_exceeded_max_attempts(&self, max_attempts: i32) -> bool {
        self.attempts >= max_attempts
    }

    /// Judges `guess` against this code
    ///
    /// Stores apply the outcome while still holding the record: a mismatch
    /// writes back the new attempt count, anything else removes the code.
    pub fn check(
        &self,
        guess: &str,
        max_attempts: i32,
        window_secs: u32,
        now: DateTime<Utc>,
    ) -> ResetCodeCheck {
        if self.is_expired(window_secs, now) {
            return ResetCodeCheck::Expired;
        }
        if self.has_exceeded_max_attempts(max_attempts) {
            return ResetCodeCheck::Burned;
        }
        if codes_match(&self.code, guess) {
            return ResetCodeCheck::Matched;
        }

        let attempts = self.attempts + 1;
        if attempts >= max_attempts {
            ResetCodeCheck::Burned
        } else {
            ResetCodeCheck::Mismatch(attempts)
        }
    }
}

/// Outcome of checking a guess against the live reset code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCodeCheck {
    /// No code is live for the address
    Missing,
    /// The code outlived its window; it has been removed
    Expired,
    /// The guess matched; the code has been consumed
    Matched,
    /// Wrong guess, carrying the new failed-attempt count
    Mismatch(i32),
    /// The attempt limit was reached; the code has been removed
    Burned,
}

/// Authorization to set a new password, issued after a code is verified
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PasswordResetGrant {
    /// SHA-256 of the grant token handed to the client
    pub token_hash: String,

    /// Account the grant applies to
    pub email: String,

    pub expires_at: DateTime<Utc>,
}

impl PasswordResetGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Countdown state reported to the verification screen
#[derive(Debug, Clone, Serialize)]
pub struct ResetCodeStatus {
    pub active: bool,
    pub remaining_seconds: u32,
    pub display: String,
}

impl From<Countdown> for ResetCodeStatus {
    fn from(countdown: Countdown) -> Self {
        Self {
            active: !countdown.is_finished(),
            remaining_seconds: countdown.remaining(),
            display: countdown.display(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn code_issued_secs_ago(secs: i64) -> PasswordResetCode {
        PasswordResetCode::new(
            "sara@gmail.com".to_string(),
            "4821".to_string(),
            Utc::now() - Duration::seconds(secs),
        )
    }

    #[test]
    fn test_is_expired() {
        let now = Utc::now();
        assert!(!code_issued_secs_ago(10).is_expired(300, now));
        assert!(code_issued_secs_ago(301).is_expired(300, now));
        assert!(code_issued_secs_ago(3600).is_expired(300, now));
    }

    #[test]
    fn test_has_exceeded_max_attempts() {
        let mut code = code_issued_secs_ago(0);
        code.attempts = 4;
        assert!(!code.has_exceeded_max_attempts(5));
        code.attempts = 5;
        assert!(code.has_exceeded_max_attempts(5));
    }

    #[test]
    fn test_check_outcomes() {
        let now = Utc::now();
        let code = code_issued_secs_ago(10);

        assert_eq!(code.check("4821", 5, 300, now), ResetCodeCheck::Matched);
        assert_eq!(code.check("1111", 5, 300, now), ResetCodeCheck::Mismatch(1));

        let mut tired = code.clone();
        tired.attempts = 4;
        assert_eq!(tired.check("1111", 5, 300, now), ResetCodeCheck::Burned);
        tired.attempts = 5;
        // even the right code is refused once the limit is hit
        assert_eq!(tired.check("4821", 5, 300, now), ResetCodeCheck::Burned);

        let stale = code_issued_secs_ago(301);
        assert_eq!(stale.check("4821", 5, 300, now), ResetCodeCheck::Expired);
    }

    #[test]
    fn test_status_from_countdown() {
        let status = ResetCodeStatus::from(Countdown::new(61));
        assert!(status.active);
        assert_eq!(status.remaining_seconds, 61);
        assert_eq!(status.display, "01:01");

        let status = ResetCodeStatus::from(Countdown::new(0));
        assert!(!status.active);
    }

    #[test]
    fn test_grant_expiry() {
        let now = Utc::now();
        let grant = PasswordResetGrant {
            token_hash: "abc".to_string(),
            email: "sara@gmail.com".to_string(),
            expires_at: now + Duration::minutes(10),
        };
        assert!(!grant.is_expired(now));
        assert!(grant.is_expired(now + Duration::minutes(11)));
    }
}
