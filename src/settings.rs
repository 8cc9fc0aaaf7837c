use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WalkSettings {
    /// Minimum time between two delivered fixes.
    pub time_interval_ms: u64,
    /// Minimum movement between two delivered fixes.
    pub distance_interval_m: f64,
    /// Timer seconds between two recovery drafts.
    pub heartbeat_every_ticks: u32,
}

impl Default for WalkSettings {
    fn default() -> Self {
        Self {
            time_interval_ms: 5_000,
            distance_interval_m: 5.0,
            heartbeat_every_ticks: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeedingSettings {
    pub meals_per_day: u32,
}

impl Default for FeedingSettings {
    fn default() -> Self {
        Self { meals_per_day: 2 }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct UserSettings {
    walk: WalkSettings,
    feeding: FeedingSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring unreadable settings at {}: {err}", path.display());
                UserSettings::default()
            })
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn walk(&self) -> WalkSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .walk
            .clone()
    }

    pub fn feeding(&self) -> FeedingSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .feeding
            .clone()
    }

    pub fn update_walk(&self, settings: WalkSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.walk = settings;
        self.persist(&guard)
    }

    pub fn update_feeding(&self, settings: FeedingSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        guard.feeding = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.walk(), WalkSettings::default());
        assert_eq!(store.feeding().meals_per_day, 2);
    }

    #[test]
    fn updates_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_walk(WalkSettings {
                time_interval_ms: 2_000,
                distance_interval_m: 10.0,
                heartbeat_every_ticks: 5,
            })
            .unwrap();
        store.update_feeding(FeedingSettings { meals_per_day: 3 }).unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        assert_eq!(reloaded.walk().time_interval_ms, 2_000);
        assert_eq!(reloaded.walk().heartbeat_every_ticks, 5);
        assert_eq!(reloaded.feeding(), FeedingSettings { meals_per_day: 3 });
    }

    #[test]
    fn partial_and_corrupt_files_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        fs::write(&path, r#"{"walk": {"distance_interval_m": 12.5}}"#).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.walk().distance_interval_m, 12.5);
        assert_eq!(store.walk().time_interval_ms, 5_000);
        assert_eq!(store.feeding().meals_per_day, 2);

        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.walk(), WalkSettings::default());
    }
}
