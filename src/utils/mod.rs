//! Utilities Module
//!
//! Shared utilities for error handling, security, validation and one-time
//! passcodes used throughout the account service.

pub mod error;
pub mod otp;
pub mod security;
pub mod validation;

// Re-export commonly used utilities
pub use error::{AppError, AppResult, ErrorResponse};
pub use otp::{codes_match, generate_reset_code, Countdown};
pub use security::*;
pub use validation::*;
