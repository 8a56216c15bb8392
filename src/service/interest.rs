//! Interest Catalogue Service
//!
//! The topics offered on the first screen and the checks sign-up runs
//! against a user's selection.

use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::models::Interest;
use crate::store::InterestStore;
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::messages;

#[derive(Clone)]
pub struct InterestService {
    store: Arc<dyn InterestStore>,
}

impl InterestService {
    pub fn new(store: Arc<dyn InterestStore>) -> Self {
        Self { store }
    }

    /// All interests, sorted by name
    pub async fn list_interests(&self) -> AppResult<Vec<Interest>> {
        Ok(self.store.list_interests().await?)
    }

    /// Add a topic to the catalogue
    pub async fn create_interest(&self, name: &str) -> AppResult<Interest> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Interest name cannot be empty".to_string()));
        }
        if name.chars().count() > 100 {
            return Err(AppError::Validation(
                "Interest name cannot exceed 100 characters".to_string(),
            ));
        }

        let interest = self.store.insert_interest(Interest::new(name)).await?;
        log::info!("Added interest '{}'", interest.name);
        Ok(interest)
    }

    /// Inserts each default name that is not present yet; returns the ones added
    pub async fn seed_defaults(&self, names: &[&str]) -> AppResult<Vec<Interest>> {
        let existing: HashSet<String> = self
            .store
            .list_interests()
            .await?
            .into_iter()
            .map(|i| i.name.to_lowercase())
            .collect();

        let mut added = Vec::new();
        for name in names {
            if !existing.contains(&name.to_lowercase()) {
                added.push(self.create_interest(name).await?);
            }
        }
        Ok(added)
    }

    /// Resolves a sign-up selection; it must be non-empty and every id must exist
    pub async fn resolve_selection(&self, ids: &[Uuid]) -> AppResult<Vec<Interest>> {
        let unique: Vec<Uuid> = ids
            .iter()
            .copied()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        if unique.is_empty() {
            return Err(AppError::Validation(messages::SELECT_INTEREST.to_string()));
        }

        let found = self.store.find_interests(&unique).await?;
        if found.len() != unique.len() {
            return Err(AppError::Validation(messages::SELECT_INTEREST.to_string()));
        }
        Ok(found)
    }
}
