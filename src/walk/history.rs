use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::models::Walk;
use crate::storage::{keys, Collection, KeyValueStore};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalkSummary {
    pub walk_count: usize,
    pub total_distance_m: f64,
    pub total_duration_secs: u64,
    pub longest_distance_m: f64,
}

/// Per-pet archive of finished walks.
#[derive(Clone)]
pub struct WalkHistory {
    store: Arc<dyn KeyValueStore>,
}

impl WalkHistory {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn walks(&self, pet_id: &str) -> Collection<Walk> {
        Collection::new(self.store.clone(), keys::walks(pet_id))
    }

    pub async fn record(&self, walk: Walk) -> Result<Walk> {
        let walks = self.walks(&walk.pet_id);
        walks.save(walk).await
    }

    /// Newest first.
    pub async fn list(&self, pet_id: &str) -> Result<Vec<Walk>> {
        let mut walks = self.walks(pet_id).get_all().await?;
        walks.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(walks)
    }

    pub async fn get(&self, pet_id: &str, walk_id: &str) -> Result<Option<Walk>> {
        self.walks(pet_id).get(walk_id).await
    }

    pub async fn delete(&self, pet_id: &str, walk_id: &str) -> Result<bool> {
        self.walks(pet_id).delete(walk_id).await
    }

    pub async fn summary(&self, pet_id: &str) -> Result<WalkSummary> {
        let walks = self.walks(pet_id).get_all().await?;
        Ok(walks.iter().fold(WalkSummary::default(), |mut acc, walk| {
            acc.walk_count += 1;
            acc.total_distance_m += walk.distance_m;
            acc.total_duration_secs += walk.duration_secs;
            acc.longest_distance_m = acc.longest_distance_m.max(walk.distance_m);
            acc
        }))
    }
}
