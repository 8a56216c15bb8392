//! Account Service
//!
//! Sign-up, email verification, login and the home-screen profile.

use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AccountPolicy;
use crate::models::{
    EmailVerification, HealthCheckResponse, LoginRequest, LoginResponse, NewUser,
    ProfileResponse, RefreshTokenResponse, SignUpRequest, SignUpResponse, User,
};
use crate::service::email_service::EmailService;
use crate::service::interest::InterestService;
use crate::service::jwt::{JwtService, ServiceError};
use crate::store::{AccountStore, StoreError};
use crate::utils::error::AppError;
use crate::utils::security::{hash_password, random_token, sha256_hex, verify_password};
use crate::utils::validation::{
    messages, normalize_email, to_international_phone, validate_full_name, validate_saudi_phone,
    validate_signup_email, PasswordChecklist, DEFAULT_SIGNUP_EMAIL_DOMAIN,
};

/// Length of the random token in a verification link
const VERIFICATION_TOKEN_LENGTH: usize = 48;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("Password requirements not met")]
    WeakPassword(PasswordChecklist),

    #[error("An account with this email already exists.")]
    EmailAlreadyExists,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Please verify your email before logging in.")]
    EmailNotVerified,

    #[error("This verification link is invalid or has expired.")]
    InvalidVerificationToken,

    #[error("This email is already verified.")]
    AlreadyVerified,

    #[error("User not found")]
    UserNotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing error: {0}")]
    Hashing(#[from] bcrypt::BcryptError),

    #[error(transparent)]
    Token(#[from] ServiceError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        let message = err.to_string();
        match err {
            AccountError::Validation(msg) => AppError::Validation(msg),
            AccountError::WeakPassword(checklist) => AppError::WeakPassword(checklist),
            AccountError::EmailAlreadyExists => AppError::Conflict(message),
            AccountError::InvalidCredentials => AppError::Authentication(message),
            AccountError::EmailNotVerified => AppError::Forbidden(message),
            AccountError::InvalidVerificationToken | AccountError::AlreadyVerified => {
                AppError::BadRequest(message)
            }
            AccountError::UserNotFound => AppError::NotFound(message),
            AccountError::Store(e) => AppError::Store(e),
            AccountError::Hashing(e) => AppError::HashingError(e),
            AccountError::Token(e) => e.into(),
            AccountError::App(e) => e,
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

/// Message shown when a sign-up address is not at the accepted domain
fn signup_email_message(domain: &str) -> String {
    if domain == DEFAULT_SIGNUP_EMAIL_DOMAIN {
        messages::INVALID_SIGNUP_EMAIL.to_string()
    } else {
        format!("Please enter a valid @{} address.", domain)
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    interests: InterestService,
    jwt: Arc<JwtService>,
    email: Arc<EmailService>,
    policy: AccountPolicy,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        interests: InterestService,
        jwt: Arc<JwtService>,
        email: Arc<EmailService>,
        policy: AccountPolicy,
    ) -> Self {
        Self {
            store,
            interests,
            jwt,
            email,
            policy,
        }
    }

    /// Creates an unverified account and mails its verification link
    ///
    /// The caller is not signed in; login is possible once the email is
    /// verified (or immediately when verification is not required).
    pub async fn sign_up(&self, request: SignUpRequest) -> AccountResult<SignUpResponse> {
        if !request.all_fields_filled() {
            return Err(AccountError::Validation(messages::FILL_ALL_FIELDS.to_string()));
        }

        let email = normalize_email(&request.email);
        if !validate_signup_email(&email, &self.policy.signup_email_domain) {
            return Err(AccountError::Validation(signup_email_message(
                &self.policy.signup_email_domain,
            )));
        }

        let phone = request.phone_number.trim();
        if !validate_saudi_phone(phone) {
            return Err(AccountError::Validation(messages::INVALID_PHONE.to_string()));
        }

        let full_name = request.full_name.trim();
        if !validate_full_name(full_name) {
            return Err(AccountError::Validation(
                "Full name cannot exceed 255 characters".to_string(),
            ));
        }

        let checklist = PasswordChecklist::evaluate(&request.password, &request.confirm_password);
        if !checklist.is_satisfied() {
            return Err(AccountError::WeakPassword(checklist));
        }

        let interests = self.interests.resolve_selection(&request.interest_ids).await?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AccountError::EmailAlreadyExists);
        }

        let password_hash = hash_password(&request.password, self.policy.bcrypt_cost)?;
        let record = self
            .store
            .insert_user(NewUser {
                full_name: full_name.to_string(),
                email,
                phone: to_international_phone(phone),
                password_hash,
                interest_ids: interests.iter().map(|i| i.id).collect(),
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AccountError::EmailAlreadyExists,
                other => AccountError::Store(other),
            })?;

        let user: User = record.into();
        log::info!("Created account {}", user.id);

        let message = match self.issue_verification(&user).await {
            Ok(()) => "Account created. Check your email to verify your address.",
            Err(e) => {
                log::warn!("Verification email for {} not sent: {}", user.id, e);
                "Account created, but we couldn't send the verification email. \
                 Please request a new link."
            }
        };

        Ok(SignUpResponse {
            message: message.to_string(),
            user,
        })
    }

    /// Confirms the address behind a verification link
    pub async fn verify_email(&self, token: &str) -> AccountResult<User> {
        let verification = self
            .store
            .find_verification(&sha256_hex(token.trim()))
            .await?
            .filter(EmailVerification::is_usable)
            .ok_or(AccountError::InvalidVerificationToken)?;

        // Only the request that flips the link to used carries on
        if !self.store.consume_verification(verification.id).await? {
            return Err(AccountError::InvalidVerificationToken);
        }
        let user: User = self
            .store
            .mark_email_verified(verification.user_id)
            .await?
            .into();

        log::info!("Verified email for user {}", user.id);

        if let Err(e) = self.email.send_welcome_email(&user.email, &user.full_name).await {
            log::warn!("Welcome email for {} not sent: {}", user.id, e);
        }

        Ok(user)
    }

    /// Mails a fresh verification link to an unverified account
    pub async fn resend_verification(&self, email: &str) -> AccountResult<()> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AccountError::Validation(messages::EMAIL_REQUIRED.to_string()));
        }

        let user: User = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AccountError::UserNotFound)?
            .into();

        if user.email_verified {
            return Err(AccountError::AlreadyVerified);
        }

        self.issue_verification(&user).await?;
        Ok(())
    }

    pub async fn login(&self, request: LoginRequest) -> AccountResult<LoginResponse> {
        let email = normalize_email(&request.email);
        if email.is_empty() || request.password.is_empty() {
            return Err(AccountError::Validation(
                messages::LOGIN_FIELDS_REQUIRED.to_string(),
            ));
        }

        let record = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(&request.password, &record.password_hash)? {
            log::debug!("Failed login for user {}", record.id);
            return Err(AccountError::InvalidCredentials);
        }

        if self.policy.require_verified_email && !record.email_verified {
            return Err(AccountError::EmailNotVerified);
        }

        let tokens = self
            .jwt
            .generate_token_pair(record.id, request.remember_me)
            .await?;

        log::info!("User {} logged in", record.id);

        Ok(LoginResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
            refresh_expires_in: tokens.refresh_expires_in,
            user: record.into(),
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> AccountResult<RefreshTokenResponse> {
        let tokens = self.jwt.refresh_access_token(refresh_token).await?;
        Ok(RefreshTokenResponse {
            access_token: tokens.access_token,
            token_type: tokens.token_type,
            expires_in: tokens.expires_in,
        })
    }

    pub async fn sign_out(&self, refresh_token: &str) -> AccountResult<()> {
        self.jwt.revoke_refresh_token(refresh_token).await?;
        Ok(())
    }

    /// Home-screen data for the signed-in user
    pub async fn profile(&self, user_id: Uuid) -> AccountResult<ProfileResponse> {
        let user: User = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(AccountError::UserNotFound)?
            .into();
        let interests = self.store.user_interests(user_id).await?;

        Ok(ProfileResponse {
            greeting: format!("Hi {}", user.full_name),
            user,
            interests,
        })
    }

    /// Drops verification links past their expiry
    pub async fn purge_expired_verifications(&self) -> AccountResult<u64> {
        let purged = self.store.purge_verifications_before(Utc::now()).await?;
        if purged > 0 {
            log::info!("Purged {} expired verification links", purged);
        }
        Ok(purged)
    }

    pub async fn health_check(&self) -> AccountResult<HealthCheckResponse> {
        self.store.ping().await?;
        Ok(HealthCheckResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    async fn issue_verification(&self, user: &User) -> AccountResult<()> {
        let token = random_token(VERIFICATION_TOKEN_LENGTH);
        let ttl_hours = self.policy.email_verification_ttl_hours;

        self.store
            .put_verification(EmailVerification::new(
                user.id,
                sha256_hex(&token),
                Utc::now() + Duration::hours(ttl_hours),
            ))
            .await?;

        self.email
            .send_verification_email(&user.email, &user.full_name, &token, ttl_hours)
            .await?;
        Ok(())
    }
}
