//! Interest Model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An entry of the interest catalogue offered on the first screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Interest {
    pub id: Uuid,
    pub name: String,
}

impl Interest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// Interests seeded into an empty catalogue by the admin tool
pub const DEFAULT_INTERESTS: &[&str] = &[
    "Artificial Intelligence",
    "Cybersecurity",
    "Cloud Computing",
    "Data Science",
    "Game Development",
    "Mobile Development",
    "Robotics",
    "Web Development",
];
