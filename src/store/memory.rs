//! In-Memory Store
//!
//! Process-local collections behind a single async lock. Used by the test
//! suite and for local runs with `STORE_BACKEND=memory`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    InterestStore, ResetCodeStore, SessionStore, StoreError, StoreResult, UserStore,
    VerificationStore,
};
use crate::models::{
    AuthSession, EmailVerification, Interest, NewUser, PasswordResetCode, PasswordResetGrant,
    ResetCodeCheck, UserRecord,
};

#[derive(Default)]
struct Collections {
    users: HashMap<Uuid, UserRecord>,
    interests: HashMap<Uuid, Interest>,
    user_interests: HashMap<Uuid, HashSet<Uuid>>,
    reset_codes: HashMap<String, PasswordResetCode>,
    reset_grants: HashMap<String, PasswordResetGrant>,
    verifications: HashMap<Uuid, EmailVerification>,
    sessions: HashMap<Uuid, AuthSession>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with the given interest names
    pub async fn with_interests<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        {
            let mut inner = store.inner.write().await;
            for name in names {
                let interest = Interest::new(name);
                inner.interests.insert(interest.id, interest);
            }
        }
        store
    }
}

fn sorted_by_name(mut interests: Vec<Interest>) -> Vec<Interest> {
    interests.sort_by(|a, b| a.name.cmp(&b.name));
    interests
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            full_name: user.full_name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        inner
            .user_interests
            .insert(record.id, user.interest_ids.into_iter().collect());
        inner.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn mark_email_verified(&self, id: Uuid) -> StoreResult<UserRecord> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
        user.email_verified = true;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl InterestStore for MemoryStore {
    async fn list_interests(&self) -> StoreResult<Vec<Interest>> {
        let inner = self.inner.read().await;
        Ok(sorted_by_name(inner.interests.values().cloned().collect()))
    }

    async fn insert_interest(&self, interest: Interest) -> StoreResult<Interest> {
        let mut inner = self.inner.write().await;
        if inner.interests.values().any(|i| i.name == interest.name) {
            return Err(StoreError::Conflict(format!(
                "Interest '{}' already exists",
                interest.name
            )));
        }
        inner.interests.insert(interest.id, interest.clone());
        Ok(interest)
    }

    async fn find_interests(&self, ids: &[Uuid]) -> StoreResult<Vec<Interest>> {
        let inner = self.inner.read().await;
        let found: Vec<Interest> = ids
            .iter()
            .collect::<HashSet<_>>()
            .into_iter()
            .filter_map(|id| inner.interests.get(id).cloned())
            .collect();
        Ok(sorted_by_name(found))
    }

    async fn user_interests(&self, user_id: Uuid) -> StoreResult<Vec<Interest>> {
        let inner = self.inner.read().await;
        let interests: Vec<Interest> = inner
            .user_interests
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| inner.interests.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(sorted_by_name(interests))
    }
}

#[async_trait]
impl ResetCodeStore for MemoryStore {
    async fn put_reset_code(&self, code: PasswordResetCode) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.reset_codes.insert(code.email.clone(), code);
        Ok(())
    }

    async fn get_reset_code(&self, email: &str) -> StoreResult<Option<PasswordResetCode>> {
        Ok(self.inner.read().await.reset_codes.get(email).cloned())
    }

    async fn delete_reset_code(&self, email: &str) -> StoreResult<()> {
        self.inner.write().await.reset_codes.remove(email);
        Ok(())
    }

    async fn check_reset_code(
        &self,
        email: &str,
        guess: &str,
        max_attempts: i32,
        window_secs: u32,
    ) -> StoreResult<ResetCodeCheck> {
        let mut inner = self.inner.write().await;
        let outcome = match inner.reset_codes.get(email) {
            Some(stored) => stored.check(guess, max_attempts, window_secs, Utc::now()),
            None => return Ok(ResetCodeCheck::Missing),
        };

        if let ResetCodeCheck::Mismatch(attempts) = outcome {
            if let Some(stored) = inner.reset_codes.get_mut(email) {
                stored.attempts = attempts;
            }
        } else {
            inner.reset_codes.remove(email);
        }
        Ok(outcome)
    }

    async fn purge_reset_codes_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.reset_codes.len();
        inner.reset_codes.retain(|_, code| code.created_at >= cutoff);
        Ok((before - inner.reset_codes.len()) as u64)
    }

    async fn put_reset_grant(&self, grant: PasswordResetGrant) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.reset_grants.insert(grant.token_hash.clone(), grant);
        Ok(())
    }

    async fn take_reset_grant(&self, token_hash: &str) -> StoreResult<Option<PasswordResetGrant>> {
        Ok(self.inner.write().await.reset_grants.remove(token_hash))
    }

    async fn purge_reset_grants_before(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.reset_grants.len();
        inner.reset_grants.retain(|_, grant| grant.expires_at > now);
        Ok((before - inner.reset_grants.len()) as u64)
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn put_verification(&self, verification: EmailVerification) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .verifications
            .retain(|_, v| v.user_id != verification.user_id || v.verified_at.is_some());
        inner.verifications.insert(verification.id, verification);
        Ok(())
    }

    async fn find_verification(
        &self,
        token_hash: &str,
    ) -> StoreResult<Option<EmailVerification>> {
        let inner = self.inner.read().await;
        Ok(inner
            .verifications
            .values()
            .find(|v| v.token_hash == token_hash)
            .cloned())
    }

    async fn consume_verification(&self, id: Uuid) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        match inner.verifications.get_mut(&id) {
            Some(verification) if verification.verified_at.is_none() => {
                verification.verified_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_verifications_before(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.verifications.len();
        inner.verifications.retain(|_, v| v.expires_at >= cutoff);
        Ok((before - inner.verifications.len()) as u64)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: AuthSession) -> StoreResult<()> {
        self.inner.write().await.sessions.insert(session.id, session);
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> StoreResult<Option<AuthSession>> {
        Ok(self.inner.read().await.sessions.get(&id).cloned())
    }

    async fn touch_session(&self, id: Uuid) -> StoreResult<()> {
        if let Some(session) = self.inner.write().await.sessions.get_mut(&id) {
            session.last_used_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> StoreResult<()> {
        self.inner.write().await.sessions.remove(&id);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - inner.sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.sessions.len();
        inner.sessions.retain(|_, s| s.expires_at > now);
        Ok((before - inner.sessions.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            full_name: "Sara Ali".to_string(),
            email: email.to_string(),
            phone: "+966512345678".to_string(),
            password_hash: "hash".to_string(),
            interest_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_insert_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.insert_user(new_user("sara@gmail.com")).await.unwrap();

        let err = store
            .insert_user(new_user("sara@gmail.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_reset_code_replaced_per_email() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .put_reset_code(PasswordResetCode::new(
                "a@gmail.com".into(),
                "1111".into(),
                now,
            ))
            .await
            .unwrap();
        store
            .put_reset_code(PasswordResetCode::new(
                "a@gmail.com".into(),
                "2222".into(),
                now,
            ))
            .await
            .unwrap();

        let code = store.get_reset_code("a@gmail.com").await.unwrap().unwrap();
        assert_eq!(code.code, "2222");
        assert_eq!(code.attempts, 0);
    }

    #[tokio::test]
    async fn test_purge_reset_codes_before() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = now - chrono::Duration::minutes(10);
        store
            .put_reset_code(PasswordResetCode::new("old@gmail.com".into(), "1111".into(), old))
            .await
            .unwrap();
        store
            .put_reset_code(PasswordResetCode::new("new@gmail.com".into(), "2222".into(), now))
            .await
            .unwrap();

        let purged = store
            .purge_reset_codes_before(now - chrono::Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_reset_code("old@gmail.com").await.unwrap().is_none());
        assert!(store.get_reset_code("new@gmail.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_insert_user_links_interests() {
        let store = MemoryStore::with_interests(["Robotics"]).await;
        let robotics = store.list_interests().await.unwrap()[0].clone();

        let mut user = new_user("sara@gmail.com");
        user.interest_ids = vec![robotics.id];
        let record = store.insert_user(user).await.unwrap();

        assert_eq!(store.user_interests(record.id).await.unwrap(), vec![robotics]);
    }

    async fn check(store: &MemoryStore, guess: &str) -> ResetCodeCheck {
        store
            .check_reset_code("a@gmail.com", guess, 5, 300)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_check_reset_code_applies_outcome() {
        let store = MemoryStore::new();
        assert_eq!(check(&store, "1111").await, ResetCodeCheck::Missing);

        store
            .put_reset_code(PasswordResetCode::new(
                "a@gmail.com".into(),
                "1111".into(),
                Utc::now(),
            ))
            .await
            .unwrap();

        assert_eq!(check(&store, "2222").await, ResetCodeCheck::Mismatch(1));
        let code = store.get_reset_code("a@gmail.com").await.unwrap().unwrap();
        assert_eq!(code.attempts, 1);

        assert_eq!(check(&store, "1111").await, ResetCodeCheck::Matched);
        assert!(store.get_reset_code("a@gmail.com").await.unwrap().is_none());
        assert_eq!(check(&store, "1111").await, ResetCodeCheck::Missing);
    }

    #[tokio::test]
    async fn test_purge_reset_grants_before() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let grants = [
            ("old", now - chrono::Duration::minutes(1)),
            ("live", now + chrono::Duration::minutes(9)),
        ];
        for (hash, expires_at) in grants {
            store
                .put_reset_grant(PasswordResetGrant {
                    token_hash: hash.into(),
                    email: "a@gmail.com".into(),
                    expires_at,
                })
                .await
                .unwrap();
        }

        assert_eq!(store.purge_reset_grants_before(now).await.unwrap(), 1);
        assert!(store.take_reset_grant("old").await.unwrap().is_none());
        assert!(store.take_reset_grant("live").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verification_links() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let expires_at = now + chrono::Duration::hours(24);
        let first = EmailVerification::new(user_id, "first".into(), expires_at);
        store.put_verification(first).await.unwrap();
        let second = EmailVerification::new(user_id, "second".into(), expires_at);
        store.put_verification(second.clone()).await.unwrap();

        // a new link replaces the unused one
        assert!(store.find_verification("first").await.unwrap().is_none());

        assert!(store.consume_verification(second.id).await.unwrap());
        assert!(!store.consume_verification(second.id).await.unwrap());

        let stale_expiry = now - chrono::Duration::hours(1);
        let stale = EmailVerification::new(Uuid::new_v4(), "stale".into(), stale_expiry);
        store.put_verification(stale).await.unwrap();
        assert_eq!(store.purge_verifications_before(now).await.unwrap(), 1);
        assert!(store.find_verification("second").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_grant_is_single_use() {
        let store = MemoryStore::new();
        store
            .put_reset_grant(PasswordResetGrant {
                token_hash: "h".into(),
                email: "a@gmail.com".into(),
                expires_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.take_reset_grant("h").await.unwrap().is_some());
        assert!(store.take_reset_grant("h").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_interests_sorted_and_filtered() {
        let store = MemoryStore::with_interests(["Robotics", "Cybersecurity"]).await;
        let all = store.list_interests().await.unwrap();
        assert_eq!(all[0].name, "Cybersecurity");
        assert_eq!(all[1].name, "Robotics");

        let found = store
            .find_interests(&[all[1].id, Uuid::new_v4(), all[1].id])
            .await
            .unwrap();
        assert_eq!(found, vec![all[1].clone()]);
    }
}
