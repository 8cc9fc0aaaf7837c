use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::geo::LocationPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("location permission was revoked")]
    PermissionRevoked,
    #[error("no location fix available")]
    NoFix,
    #[error("location service unavailable: {0}")]
    Unavailable(String),
}

/// Rate bounds requested from the device: a fix is only delivered after
/// both thresholds are met relative to the previous delivered fix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    pub time_interval_ms: u64,
    pub distance_interval_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            time_interval_ms: 5_000,
            distance_interval_m: 5.0,
        }
    }
}

impl WatchOptions {
    pub fn admits(&self, previous: Option<&LocationPoint>, candidate: &LocationPoint) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        let elapsed_ms = (candidate.timestamp - previous.timestamp).num_milliseconds();
        if elapsed_ms < self.time_interval_ms as i64 {
            return false;
        }

        previous.distance_to(candidate) >= self.distance_interval_m
    }
}

/// Live feed of fixes. Dropping it unsubscribes.
pub struct LocationSubscription {
    receiver: mpsc::Receiver<Result<LocationPoint, LocationError>>,
}

impl LocationSubscription {
    pub fn new(receiver: mpsc::Receiver<Result<LocationPoint, LocationError>>) -> Self {
        Self { receiver }
    }

    /// `None` once the provider has closed the feed.
    pub async fn next(&mut self) -> Option<Result<LocationPoint, LocationError>> {
        self.receiver.recv().await
    }

    /// A fix that is already queued, without waiting for a new one.
    pub fn try_next(&mut self) -> Option<Result<LocationPoint, LocationError>> {
        self.receiver.try_recv().ok()
    }
}

/// Device location service as seen by the walk tracker.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;
    async fn current_position(&self) -> Result<LocationPoint, LocationError>;
    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<LocationSubscription, LocationError>;
}
