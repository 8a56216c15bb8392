//! Document Store Ports
//!
//! Persistence for every collection the service owns, expressed as async
//! traits so the service layer does not care whether records live in
//! PostgreSQL or in memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AuthSession, EmailVerification, Interest, NewUser, PasswordResetCode, PasswordResetGrant,
    ResetCodeCheck, UserRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint was violated
    #[error("{0}")]
    Conflict(String),

    /// The backend failed to execute the operation
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record".to_string()),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user together with its interest links in one write; fails
    /// with `Conflict` when the email is taken
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// Lookup by normalized email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<UserRecord>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()>;

    /// Store-level liveness probe
    async fn ping(&self) -> StoreResult<()>;
}

#[async_trait]
pub trait InterestStore: Send + Sync {
    /// All interests, sorted by name
    async fn list_interests(&self) -> StoreResult<Vec<Interest>>;

    /// Insert an interest; fails with `Conflict` on a duplicate name
    async fn insert_interest(&self, interest: Interest) -> StoreResult<Interest>;

    /// The subset of `ids` that exist
    async fn find_interests(&self, ids: &[Uuid]) -> StoreResult<Vec<Interest>>;

    async fn user_interests(&self, user_id: Uuid) -> StoreResult<Vec<Interest>>;
}

#[async_trait]
pub trait ResetCodeStore: Send + Sync {
    /// Insert or replace the code for `code.email`
    async fn put_reset_code(&self, code: PasswordResetCode) -> StoreResult<()>;

    async fn get_reset_code(&self, email: &str) -> StoreResult<Option<PasswordResetCode>>;

    async fn delete_reset_code(&self, email: &str) -> StoreResult<()>;

    /// Checks `guess` against the live code for `email` and applies the
    /// outcome atomically, see [`PasswordResetCode::check`]. Concurrent
    /// checks against one code are serialized, so at most one sees `Matched`.
    async fn check_reset_code(
        &self,
        email: &str,
        guess: &str,
        max_attempts: i32,
        window_secs: u32,
    ) -> StoreResult<ResetCodeCheck>;

    /// Removes codes issued before `cutoff`, returning how many were removed
    async fn purge_reset_codes_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;

    async fn put_reset_grant(&self, grant: PasswordResetGrant) -> StoreResult<()>;

    /// Removes and returns the grant so it can only be used once
    async fn take_reset_grant(&self, token_hash: &str) -> StoreResult<Option<PasswordResetGrant>>;

    /// Removes grants that expired at or before `now`
    async fn purge_reset_grants_before(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Stores a new link, replacing the user's unused ones
    async fn put_verification(&self, verification: EmailVerification) -> StoreResult<()>;

    async fn find_verification(&self, token_hash: &str)
        -> StoreResult<Option<EmailVerification>>;

    /// Marks the link used; false when it already was
    async fn consume_verification(&self, id: Uuid) -> StoreResult<bool>;

    /// Removes links that expired before `cutoff`, used or not
    async fn purge_verifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: AuthSession) -> StoreResult<()>;

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<AuthSession>>;

    async fn touch_session(&self, id: Uuid) -> StoreResult<()>;

    async fn delete_session(&self, id: Uuid) -> StoreResult<()>;

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64>;

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64>;
}

/// Every collection the account service touches
pub trait AccountStore:
    UserStore + InterestStore + ResetCodeStore + VerificationStore + SessionStore
{
}

impl<T> AccountStore for T where
    T: UserStore + InterestStore + ResetCodeStore + VerificationStore + SessionStore
{
}
