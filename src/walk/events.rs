use serde::Serialize;

use crate::geo::LocationPoint;
use crate::models::Walk;

use super::WalkSnapshot;

/// Notifications pushed to the UI layer while a walk is tracked.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WalkEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged { snapshot: WalkSnapshot },
    #[serde(rename_all = "camelCase")]
    Position {
        fix: LocationPoint,
        segment_m: f64,
        distance_m: f64,
    },
    #[serde(rename_all = "camelCase")]
    Heartbeat { snapshot: WalkSnapshot },
    #[serde(rename_all = "camelCase")]
    TrackingStalled { walk_id: String, reason: String },
    #[serde(rename_all = "camelCase")]
    WalkCompleted { walk: Walk },
}
