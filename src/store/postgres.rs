//! PostgreSQL Store
//!
//! SQLx-backed adapter. The schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    InterestStore, ResetCodeStore, SessionStore, StoreError, StoreResult, UserStore,
    VerificationStore,
};
use crate::models::{
    AuthSession, EmailVerification, Interest, NewUser, PasswordResetCode, PasswordResetGrant,
    ResetCodeCheck, UserRecord,
};

const USER_COLUMNS: &str =
    "id, full_name, email, phone, password_hash, email_verified, created_at, updated_at";

/// Store adapter over a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique violation on `constraint` to a `Conflict` with `message`
fn map_unique_violation(err: sqlx::Error, constraint: &str, message: String) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) if db_err.constraint() == Some(constraint) => {
            StoreError::Conflict(message)
        }
        other => other.into(),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let sql = format!(
            "INSERT INTO users (full_name, email, phone, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );

        let mut tx = self.pool.begin().await?;

        let record = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&user.full_name)
            .bind(&user.email)
            .bind(&user.phone)
            .bind(&user.password_hash)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                map_unique_violation(e, "users_email_key", "Email already exists".into())
            })?;

        sqlx::query(
            "INSERT INTO user_interests (user_id, interest_id) \
             SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING",
        )
        .bind(record.id)
        .bind(user.interest_ids.as_slice())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<UserRecord> {
        let sql = format!(
            "UPDATE users SET email_verified = TRUE, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl InterestStore for PgStore {
    async fn list_interests(&self) -> StoreResult<Vec<Interest>> {
        Ok(
            sqlx::query_as::<_, Interest>("SELECT id, name FROM interests ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn insert_interest(&self, interest: Interest) -> StoreResult<Interest> {
        sqlx::query_as::<_, Interest>(
            "INSERT INTO interests (id, name) VALUES ($1, $2) RETURNING id, name",
        )
        .bind(interest.id)
        .bind(&interest.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(
                e,
                "interests_name_key",
                format!("Interest '{}' already exists", interest.name),
            )
        })
    }

    async fn find_interests(&self, ids: &[Uuid]) -> StoreResult<Vec<Interest>> {
        Ok(sqlx::query_as::<_, Interest>(
            "SELECT id, name FROM interests WHERE id = ANY($1) ORDER BY name",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn user_interests(&self, user_id: Uuid) -> StoreResult<Vec<Interest>> {
        Ok(sqlx::query_as::<_, Interest>(
            "SELECT i.id, i.name FROM interests i \
             JOIN user_interests ui ON ui.interest_id = i.id \
             WHERE ui.user_id = $1 ORDER BY i.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}

#[async_trait]
impl ResetCodeStore for PgStore {
    async fn put_reset_code(&self, code: PasswordResetCode) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_codes (email, code, created_at, attempts) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (email) DO UPDATE \
             SET code = EXCLUDED.code, created_at = EXCLUDED.created_at, \
             attempts = EXCLUDED.attempts",
        )
        .bind(&code.email)
        .bind(&code.code)
        .bind(code.created_at)
        .bind(code.attempts)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_reset_code(&self, email: &str) -> StoreResult<Option<PasswordResetCode>> {
        Ok(sqlx::query_as::<_, PasswordResetCode>(
            "SELECT email, code, created_at, attempts FROM password_reset_codes WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_reset_code(&self, email: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM password_reset_codes WHERE email = $1")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn check_reset_code(
        &self,
        email: &str,
        guess: &str,
        max_attempts: i32,
        window_secs: u32,
    ) -> StoreResult<ResetCodeCheck> {
        let mut tx = self.pool.begin().await?;

        // Row lock: concurrent guesses for this email queue up here
        let stored = sqlx::query_as::<_, PasswordResetCode>(
            "SELECT email, code, created_at, attempts FROM password_reset_codes \
             WHERE email = $1 FOR UPDATE",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(stored) = stored else {
            return Ok(ResetCodeCheck::Missing);
        };

        let outcome = stored.check(guess, max_attempts, window_secs, Utc::now());
        match outcome {
            ResetCodeCheck::Mismatch(attempts) => {
                sqlx::query("UPDATE password_reset_codes SET attempts = $2 WHERE email = $1")
                    .bind(email)
                    .bind(attempts)
                    .execute(&mut *tx)
                    .await?;
            }
            _ => {
                sqlx::query("DELETE FROM password_reset_codes WHERE email = $1")
                    .bind(email)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn purge_reset_codes_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_codes WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn put_reset_grant(&self, grant: PasswordResetGrant) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO password_reset_grants (token_hash, email, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&grant.token_hash)
        .bind(&grant.email)
        .bind(grant.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn take_reset_grant(&self, token_hash: &str) -> StoreResult<Option<PasswordResetGrant>> {
        Ok(sqlx::query_as::<_, PasswordResetGrant>(
            "DELETE FROM password_reset_grants WHERE token_hash = $1 \
             RETURNING token_hash, email, expires_at",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn purge_reset_grants_before(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM password_reset_grants WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn put_verification(&self, verification: EmailVerification) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM email_verifications WHERE user_id = $1 AND verified_at IS NULL")
            .bind(verification.user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO email_verifications (id, user_id, token_hash, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(verification.id)
        .bind(verification.user_id)
        .bind(&verification.token_hash)
        .bind(verification.expires_at)
        .bind(verification.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_verification(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<EmailVerification>> {
        Ok(sqlx::query_as::<_, EmailVerification>(
            "SELECT id, user_id, token_hash, expires_at, created_at, verified_at \
             FROM email_verifications WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn consume_verification(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE email_verifications SET verified_at = NOW() \
             WHERE id = $1 AND verified_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn purge_verifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM email_verifications WHERE expires_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: AuthSession) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO auth_sessions \
             (id, user_id, refresh_token_hash, expires_at, created_at, last_used_at, remember_me) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.refresh_token_hash)
        .bind(session.expires_at)
        .bind(session.created_at)
        .bind(session.last_used_at)
        .bind(session.remember_me)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<AuthSession>> {
        Ok(sqlx::query_as::<_, AuthSession>(
            "SELECT id, user_id, refresh_token_hash, expires_at, created_at, last_used_at, \
             remember_me FROM auth_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn touch_session(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("UPDATE auth_sessions SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
