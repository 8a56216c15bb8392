//! JWT Authentication Service
//!
//! Issues access/refresh token pairs and tracks refresh tokens as sessions in
//! the [`SessionStore`]. Only a SHA-256 hash of each refresh token is kept.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{AuthSession, TokenClaims, TokenKind, TokenPair, UserContext};
use crate::store::{SessionStore, StoreError};
use crate::utils::error::AppError;
use crate::utils::security::sha256_hex;

/// Errors raised while issuing or checking tokens
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidToken(msg) => AppError::Authentication(msg),
            ServiceError::Jwt(_) => {
                AppError::Authentication("Invalid or expired token".to_string())
            }
            ServiceError::Store(e) => AppError::Store(e),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Token lifetimes
#[derive(Debug, Clone, Copy)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
    /// Refresh lifetime when the user ticked "Remember Me"
    pub remember_me: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::days(1),
            remember_me: Duration::days(30),
        }
    }
}

/// JWT authentication service for token management and validation
#[derive(Clone)]
pub struct JwtService {
    sessions: Arc<dyn SessionStore>,
    access_secret: String,
    refresh_secret: String,
    lifetimes: TokenLifetimes,
}

impl JwtService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        access_secret: String,
        refresh_secret: String,
    ) -> Self {
        Self::with_lifetimes(sessions, access_secret, refresh_secret, TokenLifetimes::default())
    }

    pub fn with_lifetimes(
        sessions: Arc<dyn SessionStore>,
        access_secret: String,
        refresh_secret: String,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            sessions,
            access_secret,
            refresh_secret,
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Open a session for `user_id` and return its token pair
    pub async fn generate_token_pair(
        &self,
        user_id: Uuid,
        remember_me: bool,
    ) -> ServiceResult<TokenPair> {
        let now = Utc::now();
        let refresh_lifetime = if remember_me {
            self.lifetimes.remember_me
        } else {
            self.lifetimes.refresh
        };
        let refresh_expires_at = now + refresh_lifetime;

        let access_token = self.issue_access_token(user_id)?;

        let session_id = Uuid::new_v4();
        let refresh_claims = TokenClaims::refresh(user_id, session_id, now, refresh_expires_at);
        let refresh_token = encode(
            &Header::new(Algorithm::HS256),
            &refresh_claims,
            &EncodingKey::from_secret(self.refresh_secret.as_bytes()),
        )?;

        self.sessions
            .insert_session(AuthSession {
                id: session_id,
                user_id,
                refresh_token_hash: sha256_hex(&refresh_token),
                expires_at: refresh_expires_at,
                created_at: now,
                last_used_at: now,
                remember_me,
            })
            .await?;

        log::debug!("Opened session {} for user {}", session_id, user_id);

        Ok(TokenPair::bearer(
            access_token,
            refresh_token,
            self.lifetimes.access.num_seconds(),
            refresh_lifetime.num_seconds(),
        ))
    }

    /// Issue a fresh access token for the session behind `refresh_token`
    pub async fn refresh_access_token(&self, refresh_token: &str) -> ServiceResult<TokenPair> {
        let session = self.live_session(refresh_token).await?;
        let access_token = self.issue_access_token(session.user_id)?;

        self.sessions.touch_session(session.id).await?;

        let remaining = (session.expires_at - Utc::now()).num_seconds().max(0);
        Ok(TokenPair::bearer(
            access_token,
            refresh_token.to_string(),
            self.lifetimes.access.num_seconds(),
            remaining,
        ))
    }

    /// Validate an access token and extract user context
    pub fn validate_access_token(&self, token: &str) -> ServiceResult<UserContext> {
        let claims = self.decode_claims(token, &self.access_secret, TokenKind::Access)?;
        UserContext::try_from(&claims)
            .map_err(|_| ServiceError::InvalidToken("Invalid user ID in token".into()))
    }

    /// End the session behind `refresh_token`
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> ServiceResult<()> {
        let session = self.live_session(refresh_token).await?;
        self.sessions.delete_session(session.id).await?;
        Ok(())
    }

    /// End every session of a user, returning how many were removed
    pub async fn revoke_all_user_sessions(&self, user_id: Uuid) -> ServiceResult<u64> {
        Ok(self.sessions.delete_user_sessions(user_id).await?)
    }

    pub async fn cleanup_expired_sessions(&self) -> ServiceResult<u64> {
        Ok(self.sessions.delete_expired_sessions(Utc::now()).await?)
    }

    fn issue_access_token(&self, user_id: Uuid) -> ServiceResult<String> {
        let now = Utc::now();
        let claims = TokenClaims::access(user_id, now, now + self.lifetimes.access);
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.access_secret.as_bytes()),
        )?)
    }

    fn decode_claims(
        &self,
        token: &str,
        secret: &str,
        kind: TokenKind,
    ) -> ServiceResult<TokenClaims> {
        let claims = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )?
        .claims;

        if claims.kind != kind {
            return Err(ServiceError::InvalidToken("Invalid token type".into()));
        }
        Ok(claims)
    }

    /// Resolve a refresh token to its unexpired, matching session
    async fn live_session(&self, refresh_token: &str) -> ServiceResult<AuthSession> {
        let claims = self.decode_claims(refresh_token, &self.refresh_secret, TokenKind::Refresh)?;
        let session_id = claims
            .session_id()
            .ok_or_else(|| ServiceError::InvalidToken("Invalid session ID in token".into()))?;

        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidToken("Session not found".into()))?;

        if session.expires_at <= Utc::now() {
            self.sessions.delete_session(session_id).await?;
            return Err(ServiceError::InvalidToken("Refresh token expired".into()));
        }

        if session.refresh_token_hash != sha256_hex(refresh_token) {
            return Err(ServiceError::InvalidToken("Invalid refresh token".into()));
        }

        Ok(session)
    }
}
