use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::LocationPoint;
use crate::storage::Record;

/// A finished walk. Written once when the session ends and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Walk {
    #[serde(default)]
    pub id: String,
    pub pet_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: u64,
    pub distance_m: f64,
    pub average_speed_mps: f64,
    pub path: Vec<LocationPoint>,
    /// Rebuilt from a draft left behind by an app that never finished the walk.
    #[serde(default)]
    pub recovered: bool,
}

impl Walk {
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }
}

/// Meters per second, zero when no time has elapsed.
pub fn average_speed(distance_m: f64, duration_secs: u64) -> f64 {
    if duration_secs == 0 {
        0.0
    } else {
        distance_m / duration_secs as f64
    }
}

impl Record for Walk {
    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}
