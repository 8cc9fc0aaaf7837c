//! String-keyed persistence for JSON-serialized collections.
//!
//! Every entity family lives under one namespaced key (see [`keys`]); the
//! value is the whole collection as a JSON array. [`Collection`] layers
//! typed CRUD over any [`KeyValueStore`].

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::db::Database;

mod collection;

pub use collection::{Collection, Record};

pub mod keys {
    pub const PETS: &str = "pets";
    pub const FOOD_TYPES: &str = "food_types";
    pub const WALK_DRAFT: &str = "walk_draft";

    pub fn walks(pet_id: &str) -> String {
        format!("walks:{pet_id}")
    }

    pub fn meals(pet_id: &str) -> String {
        format!("meals:{pet_id}")
    }

    pub fn vaccinations(pet_id: &str) -> String {
        format!("vaccinations:{pet_id}")
    }

    /// Every per-pet key, for cascading deletes.
    pub fn owned_by(pet_id: &str) -> [String; 3] {
        [walks(pet_id), meals(pet_id), vaccinations(pet_id)]
    }
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    /// Returns whether a value was present.
    async fn remove(&self, key: &str) -> Result<bool>;
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Store backed by the `kv_entries` table.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.kv_get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.db.kv_set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        self.db.kv_remove(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.db.kv_keys_with_prefix(prefix).await
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries()?.remove(key).is_some())
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .entries()?
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}
