//! ByTechs Accounts Library
//!
//! Account backend for the ByTechs app: interest selection, sign-up with
//! email verification, login with remember-me sessions, a four-digit OTP
//! password reset and the landing-page contact form.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytechs_accounts::{
//!     api::{AppState, RouterBuilder},
//!     config::AccountPolicy,
//!     service::{EmailConfig, EmailService, JwtService},
//!     store::MemoryStore,
//!     DEFAULT_INTERESTS,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::with_interests(DEFAULT_INTERESTS.iter().copied()).await);
//!     let jwt = JwtService::new(store.clone(), "access".into(), "refresh".into());
//!     let email = EmailService::from_config(EmailConfig::default())?;
//!
//!     let state = AppState::new(store, jwt, email, AccountPolicy::default());
//!     let app = RouterBuilder::with_all_routes().build(state);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **API Layer**: axum handlers, bearer-token middleware and the route builder
//! - **Service Layer**: accounts, password reset, interests, tokens and mail
//! - **Store**: async persistence ports with PostgreSQL and in-memory adapters
//! - **Models**: records and request/response payloads
//! - **Utils**: errors, validation rules, OTP codes and hashing helpers

/// HTTP API layer with handlers and configurable routing
pub mod api;

/// Environment-driven configuration
pub mod config;

/// PostgreSQL pool and migrations
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Business logic
pub mod service;

/// Persistence ports and adapters
pub mod store;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use api::{create_routes, AppState, RouterBuilder};
pub use config::{AccountPolicy, AppConfig, JwtConfig, ServerConfig, StoreBackend, StoreConfig};
pub use models::{
    Interest, LoginRequest, ResetCodeStatus, SignUpRequest, TokenPair, User, UserContext,
    DEFAULT_INTERESTS,
};
pub use service::{
    AccountService, EmailConfig, EmailService, InterestService, JwtService, PasswordResetService,
};
pub use store::{AccountStore, MemoryStore, PgStore, StoreError};
pub use utils::error::{AppError, AppResult, ErrorResponse};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
