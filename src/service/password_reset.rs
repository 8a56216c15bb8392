//! Password Reset Service
//!
//! The forgot-password flow: a 4-digit code is mailed, verifying it yields a
//! single-use reset grant, and the grant authorizes setting a new password.

use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;

use crate::config::AccountPolicy;
use crate::models::{
    ForgotPasswordResponse, MessageResponse, PasswordResetCode, PasswordResetGrant,
    ResetCodeCheck, ResetCodeStatus, ResetPasswordRequest, VerifyResetCodeResponse,
};
use crate::service::email_service::EmailService;
use crate::service::jwt::{JwtService, ServiceError};
use crate::store::{AccountStore, StoreError};
use crate::utils::error::AppError;
use crate::utils::otp::{generate_reset_code, Countdown};
use crate::utils::security::{hash_password, random_token, sha256_hex};
use crate::utils::validation::{
    messages, normalize_email, validate_reset_code_format, PasswordChecklist,
};

const RESET_TOKEN_LENGTH: usize = 48;

#[derive(Error, Debug)]
pub enum ResetError {
    #[error("{}", messages::EMAIL_REQUIRED)]
    EmailRequired,

    #[error("No user found with this email.")]
    UserNotFound,

    #[error("{}", messages::INCOMPLETE_CODE)]
    IncompleteCode,

    #[error("{}", messages::INVALID_CODE)]
    InvalidCode,

    #[error("Too many incorrect attempts. Please request a new code.")]
    TooManyAttempts,

    #[error("Password requirements not met")]
    WeakPassword(PasswordChecklist),

    #[error("Your reset session has expired. Please request a new code.")]
    InvalidGrant,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] ServiceError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<ResetError> for AppError {
    fn from(err: ResetError) -> Self {
        let message = err.to_string();
        match err {
            ResetError::EmailRequired | ResetError::IncompleteCode => AppError::Validation(message),
            ResetError::UserNotFound => AppError::NotFound(message),
            ResetError::InvalidCode | ResetError::InvalidGrant => AppError::BadRequest(message),
            ResetError::TooManyAttempts => AppError::TooManyRequests(message),
            ResetError::WeakPassword(checklist) => AppError::WeakPassword(checklist),
            ResetError::Store(e) => AppError::Store(e),
            ResetError::Hashing(e) => AppError::HashingError(e),
            ResetError::Token(e) => e.into(),
            ResetError::App(e) => e,
        }
    }
}

pub type ResetResult<T> = Result<T, ResetError>;

#[derive(Clone)]
pub struct PasswordResetService {
    store: Arc<dyn AccountStore>,
    jwt: Arc<JwtService>,
    email: Arc<EmailService>,
    policy: AccountPolicy,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        jwt: Arc<JwtService>,
        email: Arc<EmailService>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            store,
            jwt,
            email,
            policy,
        }
    }

    /// Step 1: mail a new code, replacing any live one for the address
    pub async fn request_code(&self, email: &str) -> ResetResult<ForgotPasswordResponse> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ResetError::EmailRequired);
        }

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ResetError::UserNotFound)?;

        let code = generate_reset_code();
        self.store
            .put_reset_code(PasswordResetCode::new(email.clone(), code.clone(), Utc::now()))
            .await?;

        let ttl = self.policy.reset_code_ttl_seconds;
        if let Err(e) = self
            .email
            .send_reset_code_email(&email, &user.full_name, &code, ttl.div_ceil(60))
            .await
        {
            self.store.delete_reset_code(&email).await?;
            return Err(e.into());
        }

        log::info!("Issued password reset code for user {}", user.id);

        Ok(ForgotPasswordResponse {
            message: "A reset code has been sent to your email.".to_string(),
            email,
            expires_in: ttl,
        })
    }

    /// Step 2: exchange a correct code for a reset grant
    pub async fn verify_code(
        &self,
        email: &str,
        code: &str,
    ) -> ResetResult<VerifyResetCodeResponse> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ResetError::EmailRequired);
        }

        let code = code.trim();
        if !validate_reset_code_format(code) {
            return Err(ResetError::IncompleteCode);
        }

        let outcome = self
            .store
            .check_reset_code(
                &email,
                code,
                self.policy.reset_code_max_attempts,
                self.policy.reset_code_ttl_seconds,
            )
            .await?;

        match outcome {
            ResetCodeCheck::Matched => {}
            ResetCodeCheck::Burned => {
                log::warn!("Reset code for {} burned after too many attempts", email);
                return Err(ResetError::TooManyAttempts);
            }
            ResetCodeCheck::Missing | ResetCodeCheck::Expired | ResetCodeCheck::Mismatch(_) => {
                return Err(ResetError::InvalidCode);
            }
        }

        let token = random_token(RESET_TOKEN_LENGTH);
        let ttl = Duration::minutes(self.policy.reset_grant_ttl_minutes);
        self.store
            .put_reset_grant(PasswordResetGrant {
                token_hash: sha256_hex(&token),
                email,
                expires_at: Utc::now() + ttl,
            })
            .await?;

        Ok(VerifyResetCodeResponse {
            reset_token: token,
            expires_in: ttl.num_seconds(),
        })
    }

    /// Remaining countdown for the live code; inactive when there is none
    pub async fn code_status(&self, email: &str) -> ResetResult<ResetCodeStatus> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(ResetError::EmailRequired);
        }

        let countdown = match self.store.get_reset_code(&email).await? {
            Some(code) => code.countdown(self.policy.reset_code_ttl_seconds, Utc::now()),
            None => Countdown::new(0),
        };
        Ok(countdown.into())
    }

    /// Drops codes whose entry window has closed
    pub async fn purge_expired_codes(&self) -> ResetResult<u64> {
        let window = Duration::seconds(i64::from(self.policy.reset_code_ttl_seconds));
        let purged = self.store.purge_reset_codes_before(Utc::now() - window).await?;
        if purged > 0 {
            log::info!("Purged {} expired reset codes", purged);
        }
        Ok(purged)
    }

    /// Drops reset grants that were never used
    pub async fn purge_expired_grants(&self) -> ResetResult<u64> {
        let purged = self.store.purge_reset_grants_before(Utc::now()).await?;
        if purged > 0 {
            log::info!("Purged {} expired reset grants", purged);
        }
        Ok(purged)
    }

    /// Step 3: consume the grant and replace the password
    ///
    /// Every session of the user is revoked so other devices must log in again.
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> ResetResult<MessageResponse> {
        let checklist = PasswordChecklist::evaluate(&request.password, &request.confirm_password);
        if !checklist.is_satisfied() {
            return Err(ResetError::WeakPassword(checklist));
        }

        let token = request.reset_token.trim();
        if token.is_empty() {
            return Err(ResetError::InvalidGrant);
        }

        let grant = self
            .store
            .take_reset_grant(&sha256_hex(token))
            .await?
            .filter(|grant| !grant.is_expired(Utc::now()))
            .ok_or(ResetError::InvalidGrant)?;

        let user = self
            .store
            .find_user_by_email(&grant.email)
            .await?
            .ok_or(ResetError::UserNotFound)?;

        let password_hash = hash_password(&request.password, self.policy.bcrypt_cost)?;
        self.store.update_password_hash(user.id, &password_hash).await?;
        let revoked = self.jwt.revoke_all_user_sessions(user.id).await?;

        log::info!(
            "Password reset for user {}; revoked {} sessions",
            user.id,
            revoked
        );

        Ok(MessageResponse::new(
            "Your password has been updated. You can now log in.",
        ))
    }
}
