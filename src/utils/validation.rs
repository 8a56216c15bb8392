//! Validation Utilities
//!
//! Form-field predicates shared by the sign-up, login and password reset
//! flows, plus adapters that plug them into `validator` derive macros.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use validator::ValidationError;

/// Email domain accepted at sign-up unless configured otherwise
pub const DEFAULT_SIGNUP_EMAIL_DOMAIN: &str = "gmail.com";

/// International calling code prefixed to stored phone numbers
pub const SAUDI_CALLING_CODE: &str = "966";

/// Minimum password length is strictly greater than this, counted in UTF-16
/// code units as the web and mobile clients count it
pub const PASSWORD_MIN_EXCLUSIVE_LENGTH: usize = 8;

/// Validates email address format using a general-purpose regex pattern
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email)
}

/// Validates a sign-up address: a plain local part at exactly `domain`
pub fn validate_signup_email(email: &str, domain: &str) -> bool {
    static LOCAL_PART_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = LOCAL_PART_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+$").expect("Failed to compile local part regex")
    });

    match email.rsplit_once('@') {
        Some((local, host)) => regex.is_match(local) && host == domain,
        None => false,
    }
}

/// Normalizes email address to lowercase and removes whitespace
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates a Saudi mobile number in national format, e.g. `512345678`
pub fn validate_saudi_phone(phone: &str) -> bool {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^5[0-9]{8}$").expect("Failed to compile phone regex"));

    regex.is_match(phone)
}

/// Formats a validated national number as `+966XXXXXXXXX`
pub fn to_international_phone(national: &str) -> String {
    format!("+{}{}", SAUDI_CALLING_CODE, national)
}

/// Validates that a full name is present and not overly long
pub fn validate_full_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.chars().count() <= 255
}

/// Validates that a reset code is exactly four ASCII digits
pub fn validate_reset_code_format(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Rule-by-rule outcome of checking a password and its confirmation
///
/// Mirrors the checklist shown under the password fields: each flag turns
/// green independently as the user types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PasswordChecklist {
    pub length: bool,
    pub digit: bool,
    pub capital: bool,
    pub special: bool,
    pub matches: bool,
}

impl PasswordChecklist {
    pub const LENGTH_LABEL: &'static str = "Password Length > 8";
    pub const DIGIT_LABEL: &'static str = "At least 1 digit";
    pub const CAPITAL_LABEL: &'static str = "At least 1 capital letter";
    pub const SPECIAL_LABEL: &'static str = "At least 1 special character";
    pub const MATCH_LABEL: &'static str = "Password matches confirm password";

    /// Evaluates all five rules against a password and its confirmation
    pub fn evaluate(password: &str, confirmation: &str) -> Self {
        Self {
            length: password.encode_utf16().count() > PASSWORD_MIN_EXCLUSIVE_LENGTH,
            digit: password.chars().any(|c| c.is_ascii_digit()),
            capital: password.chars().any(|c| c.is_ascii_uppercase()),
            special: password.chars().any(|c| !c.is_ascii_alphanumeric()),
            matches: password == confirmation,
        }
    }

    /// True iff every rule holds
    pub fn is_satisfied(&self) -> bool {
        self.length && self.digit && self.capital && self.special && self.matches
    }

    /// Labels of the rules that do not hold, in display order
    pub fn unmet(&self) -> Vec<&'static str> {
        [
            (self.length, Self::LENGTH_LABEL),
            (self.digit, Self::DIGIT_LABEL),
            (self.capital, Self::CAPITAL_LABEL),
            (self.special, Self::SPECIAL_LABEL),
            (self.matches, Self::MATCH_LABEL),
        ]
        .into_iter()
        .filter(|(ok, _)| !ok)
        .map(|(_, label)| label)
        .collect()
    }
}

/// Checks a password and its confirmation, returning true iff all rules hold
pub fn validate_password(password: &str, confirmation: &str) -> bool {
    PasswordChecklist::evaluate(password, confirmation).is_satisfied()
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email").with_message(messages::INVALID_EMAIL.into()))
    }
}

/// Custom validator for full-name fields using the validator crate
pub fn full_name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_full_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name").with_message(messages::FIELD_REQUIRED.into()))
    }
}

/// Validation error messages for user-friendly responses
pub mod messages {
    pub const FILL_ALL_FIELDS: &str = "Please fill all fields.";
    pub const INVALID_EMAIL: &str = "Please enter a valid email address";
    pub const INVALID_SIGNUP_EMAIL: &str = "Please enter a valid Gmail address.";
    pub const INVALID_PHONE: &str = "Enter a valid Saudi number (e.g., 512345678).";
    pub const PASSWORD_REQUIREMENTS: &str = "Please meet all password requirements.";
    pub const SELECT_INTEREST: &str = "Please select at least one interest";
    pub const LOGIN_FIELDS_REQUIRED: &str = "Please enter both email and password";
    pub const EMAIL_REQUIRED: &str = "Please enter your email.";
    pub const INCOMPLETE_CODE: &str = "Enter the full 4-digit code.";
    pub const INVALID_CODE: &str = "Incorrect or expired code.";
    pub const FIELD_REQUIRED: &str = "This field is required";
}
