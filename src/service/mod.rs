//! Service Layer
//!
//! Business logic of the account service, written against the store ports.

pub mod account;
pub mod email_service;
pub mod interest;
pub mod jwt;
pub mod password_reset;

// Re-export services
pub use account::{AccountError, AccountService};
pub use email_service::{
    EmailConfig, EmailService, MailTransport, MemoryTransport, SmtpMailTransport,
};
pub use interest::InterestService;
pub use jwt::{JwtService, ServiceError, TokenLifetimes};
pub use password_reset::{PasswordResetService, ResetError};
