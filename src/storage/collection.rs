use std::{marker::PhantomData, sync::Arc};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use super::KeyValueStore;

/// An entity persisted inside a [`Collection`]. An empty id means the
/// record has not been saved yet.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn id(&self) -> &str;
    fn assign_id(&mut self, id: String);

    /// Called on every save.
    fn touch(&mut self, _now: DateTime<Utc>) {}
}

/// Typed view over the JSON array stored at one key.
///
/// Writes are read-modify-write of the whole array; there is no locking
/// across concurrent writers of the same key.
pub struct Collection<T> {
    store: Arc<dyn KeyValueStore>,
    key: String,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            key: self.key.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            _record: PhantomData,
        }
    }

    pub async fn get_all(&self) -> Result<Vec<T>> {
        match self.store.get(&self.key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .with_context(|| format!("corrupt collection under key {}", self.key)),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>> {
        Ok(self.get_all().await?.into_iter().find(|item| item.id() == id))
    }

    /// Inserts or replaces by id, generating one when the record has none.
    pub async fn save(&self, mut item: T) -> Result<T> {
        if item.id().is_empty() {
            item.assign_id(Uuid::new_v4().to_string());
        }
        item.touch(Utc::now());

        let mut items = self.get_all().await?;
        match items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => *existing = item.clone(),
            None => items.push(item.clone()),
        }

        self.write(&items).await?;
        Ok(item)
    }

    /// Returns whether a record with `id` existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut items = self.get_all().await?;
        let before = items.len();
        items.retain(|item| item.id() != id);
        if items.len() == before {
            return Ok(false);
        }

        self.write(&items).await?;
        Ok(true)
    }

    pub async fn delete_all(&self) -> Result<()> {
        self.store.remove(&self.key).await?;
        Ok(())
    }

    async fn write(&self, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)
            .with_context(|| format!("failed to serialize collection {}", self.key))?;
        self.store.set(&self.key, raw).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::FoodType;
    use crate::storage::MemoryStore;

    fn kibble(name: &str) -> FoodType {
        FoodType {
            id: String::new(),
            name: name.to_string(),
            brand: None,
            calories_per_100g: 350.0,
        }
    }

    fn collection(store: &MemoryStore) -> Collection<FoodType> {
        Collection::new(Arc::new(store.clone()), "food_types")
    }

    #[tokio::test]
    async fn missing_key_reads_as_empty() {
        let foods = collection(&MemoryStore::new());
        assert!(foods.get_all().await.unwrap().is_empty());
        assert_eq!(foods.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_generates_id_and_upserts() {
        let foods = collection(&MemoryStore::new());

        let saved = foods.save(kibble("Chicken")).await.unwrap();
        assert!(!saved.id.is_empty());
        assert!(Uuid::parse_str(&saved.id).is_ok());

        let mut renamed = saved.clone();
        renamed.name = "Chicken & Rice".into();
        foods.save(renamed.clone()).await.unwrap();

        assert_eq!(foods.get_all().await.unwrap(), vec![renamed]);
    }

    #[tokio::test]
    async fn save_keeps_caller_supplied_id() {
        let foods = collection(&MemoryStore::new());
        let mut food = kibble("Lamb");
        food.id = "lamb-1".into();

        let saved = foods.save(food).await.unwrap();
        assert_eq!(saved.id, "lamb-1");
        assert_eq!(foods.get("lamb-1").await.unwrap().map(|f| f.name), Some("Lamb".to_string()));
    }

    #[tokio::test]
    async fn delete_and_delete_all() {
        let store = MemoryStore::new();
        let foods = collection(&store);
        let a = foods.save(kibble("A")).await.unwrap();
        let b = foods.save(kibble("B")).await.unwrap();

        assert!(foods.delete(&a.id).await.unwrap());
        assert!(!foods.delete(&a.id).await.unwrap());
        assert_eq!(foods.get_all().await.unwrap(), vec![b]);

        foods.delete_all().await.unwrap();
        assert!(foods.get_all().await.unwrap().is_empty());
        assert_eq!(store.get("food_types").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_payload_is_an_error() {
        let store = MemoryStore::new();
        store.set("food_types", "not json".into()).await.unwrap();
        let err = collection(&store).get_all().await.unwrap_err();
        assert!(err.to_string().contains("food_types"));
    }
}
