//! Data Models Module
//!
//! Records kept in the store, token types and API request/response payloads.

pub mod auth;
pub mod email_verification;
pub mod interest;
pub mod password_reset;
pub mod requests;
pub mod user;

// Re-export commonly used types
pub use auth::*;
pub use email_verification::EmailVerification;
pub use interest::{Interest, DEFAULT_INTERESTS};
pub use password_reset::{PasswordResetCode, PasswordResetGrant, ResetCodeCheck, ResetCodeStatus};
pub use requests::*;
pub use user::*;
