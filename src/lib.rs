pub mod db;
pub mod error;
pub mod geo;
pub mod location;
pub mod models;
pub mod nutrition;
pub mod records;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod walk;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use log::{info, warn};

use db::Database;
use location::LocationProvider;
use records::PetRecords;
use settings::SettingsStore;
use storage::{KeyValueStore, SqliteStore};
use walk::{WalkConfig, WalkController};

pub use error::{Error, Result};

/// Everything the mobile shell talks to, wired against one data directory.
pub struct App {
    db: Database,
    store: Arc<dyn KeyValueStore>,
    settings: SettingsStore,
    walks: WalkController,
    records: PetRecords,
}

impl App {
    pub async fn open(
        data_dir: &Path,
        location: Arc<dyn LocationProvider>,
    ) -> anyhow::Result<Self> {
        utils::logging::init();
        info!("PawTrack starting up...");

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let database = Database::new(data_dir.join("pawtrack.sqlite3"))?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(database.clone()));
        let settings = SettingsStore::new(data_dir.join("settings.json"))?;

        let walks = WalkController::new(
            location,
            store.clone(),
            WalkConfig::from_settings(&settings.walk()),
        );

        // Finalize walks that were running when the app was last killed.
        match walks.recover_draft().await {
            Ok(Some(walk)) => warn!("Recovered interrupted walk {}", walk.id),
            Ok(None) => {}
            Err(err) => warn!("Walk draft recovery failed: {err}"),
        }

        Ok(Self {
            db: database,
            records: PetRecords::new(store.clone()),
            store,
            settings,
            walks,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn walks(&self) -> &WalkController {
        &self.walks
    }

    pub fn records(&self) -> &PetRecords {
        &self.records
    }
}
