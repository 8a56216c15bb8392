//! Request and Response Models
//!
//! Payloads for the account API. Request structs carry `validator` rules for
//! shape checks; the business rules that produce user-facing messages (e.g.
//! the password checklist) run in the service layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Interest, User};
use crate::utils::validation::{email_validator, full_name_validator};

/// Sign-up form, submitted after the interest selection screen
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub full_name: String,

    #[serde(default)]
    pub email: String,

    /// National number without calling code, e.g. `512345678`
    #[serde(default)]
    pub phone_number: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub confirm_password: String,

    /// Interest ids chosen on the first screen
    #[serde(default)]
    pub interest_ids: Vec<Uuid>,
}

impl SignUpRequest {
    /// True when every text field has content
    pub fn all_fields_filled(&self) -> bool {
        [
            &self.full_name,
            &self.email,
            &self.phone_number,
            &self.password,
            &self.confirm_password,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Response for a successful sign-up
#[derive(Debug, Serialize)]
pub struct SignUpResponse {
    pub message: String,
    pub user: User,
}

/// Email verification link payload
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Verification token cannot be empty"))]
    pub token: String,
}

/// Request to resend the verification link
#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,
}

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,

    /// Selects the long-lived refresh token
    #[serde(default)]
    pub remember_me: bool,
}

/// Response for a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub user: User,
}

/// Request payload for refreshing or revoking a session
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "Refresh token cannot be empty"))]
    pub refresh_token: String,
}

/// Response for token refresh operations
#[derive(Debug, Serialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Step 1 of the reset flow: "Did you forget your password?"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// Response after a reset code was mailed
#[derive(Debug, Serialize)]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub email: String,
    /// Seconds the code may be entered
    pub expires_in: u32,
}

/// Step 2: the four code boxes, joined
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyResetCodeRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub code: String,
}

/// Response carrying the grant that authorizes step 3
#[derive(Debug, Serialize)]
pub struct VerifyResetCodeResponse {
    pub reset_token: String,
    pub expires_in: i64,
}

/// Query for the countdown shown on the verification screen
#[derive(Debug, Deserialize)]
pub struct ResetCodeStatusQuery {
    pub email: String,
}

/// Step 3: "Set a new password"
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub reset_token: String,

    #[serde(default)]
    pub password: String,

    #[serde(default)]
    pub confirm_password: String,
}

/// Home screen payload
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub greeting: String,
    pub user: User,
    pub interests: Vec<Interest>,
}

/// Landing-page contact form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(custom(function = "full_name_validator"))]
    pub name: String,

    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(min = 1, max = 5000, message = "Please enter a message"))]
    pub message: String,
}

/// Generic acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response for health check
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_up_fields_filled() {
        let mut request = SignUpRequest {
            full_name: "Sara Ali".to_string(),
            email: "sara@gmail.com".to_string(),
            phone_number: "512345678".to_string(),
            password: "SecurePass1!".to_string(),
            confirm_password: "SecurePass1!".to_string(),
            interest_ids: vec![Uuid::new_v4()],
        };
        assert!(request.all_fields_filled());

        request.phone_number = "  ".to_string();
        assert!(!request.all_fields_filled());
    }

    #[test]
    fn test_sign_up_missing_fields_deserialize_empty() {
        let request: SignUpRequest = serde_json::from_str(r#"{"email":"a@gmail.com"}"#).unwrap();
        assert!(request.full_name.is_empty());
        assert!(request.interest_ids.is_empty());
        assert!(!request.all_fields_filled());
    }

    #[test]
    fn test_contact_request_validation() {
        let request = ContactRequest {
            name: "Omar".to_string(),
            email: "omar@example.com".to_string(),
            message: "I'd like a demo.".to_string(),
        };
        assert!(request.validate().is_ok());

        let empty = ContactRequest {
            name: String::new(),
            email: "bad".to_string(),
            message: String::new(),
        };
        let errors = empty.validate().unwrap_err();
        assert_eq!(errors.field_errors().len(), 3);
    }

    #[test]
    fn test_login_remember_me_defaults_off() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"email":"a@gmail.com","password":"x"}"#).unwrap();
        assert!(!request.remember_me);
    }
}
