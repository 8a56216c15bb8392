//! User Model
//!
//! Account records as kept in the `users` collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User representation for external API responses
///
/// Never carries the password hash. All timestamps are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: Uuid,

    /// Name shown on the home screen greeting
    pub full_name: String,

    /// Email address (unique, normalized)
    pub email: String,

    /// Phone number in international format, e.g. `+966512345678`
    pub phone: String,

    /// Whether the user has confirmed their email address
    pub email_verified: bool,

    /// Timestamp when the account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp when the record was last modified
    pub updated_at: DateTime<Utc>,
}

/// Stored user record including the password hash
///
/// Only the store and the account service handle this type; it is converted
/// into [`User`] before leaving the service layer.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String,
    /// Interests linked in the same write as the user row
    pub interest_ids: Vec<Uuid>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            full_name: record.full_name,
            email: record.email,
            phone: record.phone,
            email_verified: record.email_verified,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_conversion_drops_hash() {
        let record = UserRecord {
            id: Uuid::new_v4(),
            full_name: "Sara Ali".to_string(),
            email: "sara@gmail.com".to_string(),
            phone: "+966512345678".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let user: User = record.clone().into();

        assert_eq!(user.id, record.id);
        assert_eq!(user.full_name, "Sara Ali");
        assert_eq!(user.phone, "+966512345678");
        assert!(!user.email_verified);

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
