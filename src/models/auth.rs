//! Authentication Models
//!
//! Token pairs, JWT claims and login sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authentication session backing a refresh token
///
/// Sessions track login state across app restarts; the refresh token itself
/// is stored only as a SHA-256 hash.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthSession {
    /// Unique identifier for the session
    pub id: Uuid,

    /// Reference to the user who owns this session
    pub user_id: Uuid,

    /// Hashed refresh token
    pub refresh_token_hash: String,

    /// Timestamp when the session expires
    pub expires_at: DateTime<Utc>,

    /// Timestamp when the session was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the session was last used
    pub last_used_at: DateTime<Utc>,

    /// Whether the session was opened with "Remember Me"
    pub remember_me: bool,
}

/// Access and refresh tokens issued on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,

    /// Always "Bearer"
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,

    /// Refresh token lifetime in seconds; longer with "Remember Me"
    pub refresh_expires_in: i64,
}

impl TokenPair {
    pub fn bearer(
        access_token: String,
        refresh_token: String,
        expires_in: i64,
        refresh_expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
            refresh_expires_in,
        }
    }
}

/// Distinguishes the two token kinds so one cannot stand in for the other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims carried by both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User id
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub jti: String,

    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Session backing a refresh token; absent on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

impl TokenClaims {
    pub fn access(user_id: Uuid, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Access,
            sid: None,
        }
    }

    pub fn refresh(
        user_id: Uuid,
        session_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            exp: expires_at.timestamp(),
            iat: issued_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
            kind: TokenKind::Refresh,
            sid: Some(session_id.to_string()),
        }
    }

    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }

    /// Session id of a refresh token
    pub fn session_id(&self) -> Option<Uuid> {
        self.sid.as_deref().and_then(|sid| Uuid::parse_str(sid).ok())
    }
}

/// The authenticated caller, attached to requests by the auth middleware
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: Uuid,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

impl TryFrom<&TokenClaims> for UserContext {
    type Error = uuid::Error;

    fn try_from(claims: &TokenClaims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            token_id: claims.jti.clone(),
            expires_at: DateTime::from_timestamp(claims.exp, 0).unwrap_or_else(Utc::now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_bearer_pair() {
        let pair = TokenPair::bearer("a".into(), "r".into(), 900, 86_400);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.refresh_expires_in, 86_400);
    }

    #[test]
    fn test_access_claims_have_no_session() {
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let claims = TokenClaims::access(user_id, now, now + Duration::minutes(15));

        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.user_id().unwrap(), user_id);
        assert!(claims.session_id().is_none());

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "access");
        assert!(json.get("sid").is_none());
    }

    #[test]
    fn test_refresh_claims_carry_session() {
        let now = Utc::now();
        let session_id = Uuid::new_v4();
        let claims =
            TokenClaims::refresh(Uuid::new_v4(), session_id, now, now + Duration::days(30));

        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(claims.session_id(), Some(session_id));
        assert_ne!(
            claims.jti,
            TokenClaims::refresh(Uuid::new_v4(), session_id, now, now).jti
        );
    }

    #[test]
    fn test_user_context_from_claims() {
        let now = Utc::now();
        let expires_at = now + Duration::minutes(15);
        let claims = TokenClaims::access(Uuid::new_v4(), now, expires_at);

        let context = UserContext::try_from(&claims).unwrap();
        assert_eq!(context.token_id, claims.jti);
        assert_eq!(context.expires_at.timestamp(), expires_at.timestamp());
    }
}
