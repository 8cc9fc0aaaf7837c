use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::LocationPoint;
use crate::models::{average_speed, Walk};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WalkStatus {
    #[default]
    Idle,
    Active,
    Paused,
    Finished,
}

impl WalkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalkStatus::Idle => "idle",
            WalkStatus::Active => "active",
            WalkStatus::Paused => "paused",
            WalkStatus::Finished => "finished",
        }
    }

    /// A session exists and can still be finished or discarded.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, WalkStatus::Active | WalkStatus::Paused)
    }
}

impl fmt::Display for WalkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory state of the current walk session. Also the shape of the
/// crash-recovery draft.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkState {
    pub status: WalkStatus,
    pub walk_id: Option<String>,
    pub pet_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub distance_m: f64,
    pub path: Vec<LocationPoint>,
    /// The location feed failed; the timer keeps running but no distance
    /// accrues until the next resume.
    #[serde(default)]
    pub stalled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WalkSnapshot {
    pub status: WalkStatus,
    pub walk_id: Option<String>,
    pub pet_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_secs: u64,
    pub distance_m: f64,
    pub average_speed_mps: f64,
    pub point_count: usize,
    pub last_fix: Option<LocationPoint>,
    pub stalled: bool,
}

impl WalkState {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&self, action: &'static str, allowed: &[WalkStatus]) -> Result<()> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    pub fn ensure_can_start(&self) -> Result<()> {
        self.ensure("start", &[WalkStatus::Idle])
    }

    pub fn begin(
        &mut self,
        walk_id: String,
        pet_id: String,
        started_at: DateTime<Utc>,
        initial_fix: Option<LocationPoint>,
    ) -> Result<()> {
        self.ensure_can_start()?;
        *self = Self {
            status: WalkStatus::Active,
            walk_id: Some(walk_id),
            pet_id: Some(pet_id),
            started_at: Some(started_at),
            elapsed_secs: 0,
            distance_m: 0.0,
            path: initial_fix.into_iter().collect(),
            stalled: false,
        };
        Ok(())
    }

    pub fn ensure_can_pause(&self) -> Result<()> {
        self.ensure("pause", &[WalkStatus::Active])
    }

    pub fn ensure_can_finish(&self) -> Result<()> {
        self.ensure("finish", &[WalkStatus::Active, WalkStatus::Paused])
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_can_pause()?;
        self.status = WalkStatus::Paused;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.ensure("resume", &[WalkStatus::Paused])?;
        self.status = WalkStatus::Active;
        self.stalled = false;
        Ok(())
    }

    /// Appends a fix and returns the distance it added. Ignored unless the
    /// session is active.
    pub fn record_fix(&mut self, fix: LocationPoint) -> Option<f64> {
        if self.status != WalkStatus::Active || !fix.is_valid() {
            return None;
        }

        let segment = self
            .path
            .last()
            .map(|previous| previous.distance_to(&fix))
            .unwrap_or(0.0);
        self.distance_m += segment;
        self.path.push(fix);
        Some(segment)
    }

    /// One timer second. Only counts while active.
    pub fn tick(&mut self) -> bool {
        if self.status != WalkStatus::Active {
            return false;
        }
        self.elapsed_secs += 1;
        true
    }

    pub fn mark_stalled(&mut self) {
        if self.status.is_in_progress() {
            self.stalled = true;
        }
    }

    pub fn average_speed(&self) -> f64 {
        average_speed(self.distance_m, self.elapsed_secs)
    }

    /// Closes the session and produces its record. The state stays
    /// `Finished` until [`WalkState::reset`].
    pub fn finish(&mut self, ended_at: DateTime<Utc>) -> Result<Walk> {
        self.ensure_can_finish()?;
        let walk = self.to_walk(ended_at, false)?;
        self.status = WalkStatus::Finished;
        Ok(walk)
    }

    /// Builds a walk from an abandoned draft.
    pub fn into_recovered_walk(self, ended_at: DateTime<Utc>) -> Result<Walk> {
        let ended_at = self
            .path
            .last()
            .map(|fix| fix.timestamp)
            .unwrap_or(ended_at);
        self.to_walk(ended_at, true)
    }

    fn to_walk(&self, ended_at: DateTime<Utc>, recovered: bool) -> Result<Walk> {
        let (Some(walk_id), Some(pet_id), Some(started_at)) =
            (&self.walk_id, &self.pet_id, self.started_at)
        else {
            return Err(Error::invalid_argument(
                "walk session is missing its id, pet or start time",
            ));
        };

        Ok(Walk {
            id: walk_id.clone(),
            pet_id: pet_id.clone(),
            started_at,
            ended_at: ended_at.max(started_at),
            duration_secs: self.elapsed_secs,
            distance_m: self.distance_m,
            average_speed_mps: self.average_speed(),
            path: self.path.clone(),
            recovered,
        })
    }

    /// Throws the session away without producing a record.
    pub fn discard(&mut self) -> Result<()> {
        self.ensure("discard", &[WalkStatus::Active, WalkStatus::Paused])?;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn snapshot(&self) -> WalkSnapshot {
        WalkSnapshot {
            status: self.status,
            walk_id: self.walk_id.clone(),
            pet_id: self.pet_id.clone(),
            started_at: self.started_at,
            elapsed_secs: self.elapsed_secs,
            distance_m: self.distance_m,
            average_speed_mps: self.average_speed(),
            point_count: self.path.len(),
            last_fix: self.path.last().copied(),
            stalled: self.stalled,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn fix(lat: f64, secs: i64) -> LocationPoint {
        let base = DateTime::parse_from_rfc3339("2026-10-16T07:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        LocationPoint::new(lat, 13.4, base + Duration::seconds(secs))
    }

    fn active() -> WalkState {
        let mut state = WalkState::new();
        state
            .begin("w1".into(), "p1".into(), fix(0.0, 0).timestamp, Some(fix(52.0, 0)))
            .unwrap();
        state
    }

    #[test]
    fn begin_records_initial_fix() {
        let state = active();
        assert_eq!(state.status, WalkStatus::Active);
        assert_eq!(state.path.len(), 1);
        assert_eq!(state.distance_m, 0.0);
    }

    #[test]
    fn distance_is_monotonic_while_active() {
        let mut state = active();
        let mut previous = state.distance_m;
        for (i, lat) in [52.0001, 52.0001, 52.0, 52.0003, 51.9999].into_iter().enumerate() {
            let added = state.record_fix(fix(lat, i as i64 + 1)).unwrap();
            assert!(added >= 0.0);
            assert!(state.distance_m >= previous);
            previous = state.distance_m;
        }
        assert_eq!(state.path.len(), 6);
        assert!(state.distance_m > 0.0);
    }

    #[test]
    fn jitter_is_counted_as_distance() {
        let mut state = active();
        state.record_fix(fix(52.001, 1));
        state.record_fix(fix(52.0, 2));
        let one_way = fix(52.0, 0).distance_to(&fix(52.001, 0));
        assert!((state.distance_m - 2.0 * one_way).abs() < 1e-6);
    }

    #[test]
    fn fixes_outside_active_are_ignored() {
        let mut state = active();
        state.pause().unwrap();
        assert_eq!(state.record_fix(fix(52.01, 5)), None);
        assert!(!state.tick());
        assert_eq!(state.path.len(), 1);

        let mut idle = WalkState::new();
        assert_eq!(idle.record_fix(fix(1.0, 1)), None);
    }

    #[test]
    fn invalid_fixes_are_dropped() {
        let mut state = active();
        assert_eq!(state.record_fix(fix(f64::NAN, 1)), None);
        assert_eq!(state.record_fix(fix(95.0, 1)), None);
        assert_eq!(state.path.len(), 1);
    }

    #[test]
    fn pause_and_resume_keep_progress() {
        let mut state = active();
        state.record_fix(fix(52.001, 1));
        state.tick();
        state.tick();
        let distance = state.distance_m;

        state.pause().unwrap();
        state.resume().unwrap();
        assert_eq!(state.elapsed_secs, 2);
        assert_eq!(state.distance_m, distance);

        state.tick();
        assert_eq!(state.elapsed_secs, 3);
    }

    #[test]
    fn transitions_are_checked() {
        let mut state = WalkState::new();
        assert!(matches!(
            state.pause(),
            Err(Error::InvalidTransition { action: "pause", status: WalkStatus::Idle })
        ));
        assert!(state.resume().is_err());
        assert!(state.finish(Utc::now()).is_err());

        let mut state = active();
        assert!(state.resume().is_err());
        assert!(state
            .begin("w2".into(), "p1".into(), Utc::now(), None)
            .is_err());
        state.pause().unwrap();
        assert!(state.pause().is_err());
    }

    #[test]
    fn finish_computes_speed_and_stays_finished_until_reset() {
        let mut state = active();
        state.record_fix(fix(52.001, 10));
        for _ in 0..10 {
            state.tick();
        }

        let walk = state.finish(fix(0.0, 10).timestamp).unwrap();
        assert_eq!(walk.id, "w1");
        assert_eq!(walk.pet_id, "p1");
        assert_eq!(walk.duration_secs, 10);
        assert_eq!(walk.path.len(), 2);
        assert!((walk.average_speed_mps - walk.distance_m / 10.0).abs() < 1e-9);
        assert!(!walk.recovered);

        assert_eq!(state.status, WalkStatus::Finished);
        assert!(state.ensure_can_start().is_err());
        state.reset();
        assert_eq!(state.status, WalkStatus::Idle);
        assert!(state.path.is_empty());
    }

    #[test]
    fn transition_checks_leave_state_untouched() {
        let mut state = active();
        state.ensure_can_pause().unwrap();
        state.ensure_can_finish().unwrap();
        assert_eq!(state.status, WalkStatus::Active);

        state.pause().unwrap();
        assert!(state.ensure_can_pause().is_err());
        state.ensure_can_finish().unwrap();
        assert!(WalkState::new().ensure_can_finish().is_err());
    }

    #[test]
    fn finishing_immediately_has_zero_speed() {
        let mut state = active();
        let walk = state.finish(Utc::now()).unwrap();
        assert_eq!(walk.duration_secs, 0);
        assert_eq!(walk.average_speed_mps, 0.0);
    }

    #[test]
    fn stall_is_cleared_by_resume() {
        let mut state = active();
        state.mark_stalled();
        assert!(state.snapshot().stalled);
        assert!(state.tick());
        state.pause().unwrap();
        state.resume().unwrap();
        assert!(!state.stalled);
    }

    #[test]
    fn recovered_walk_ends_at_last_fix() {
        let mut state = active();
        state.record_fix(fix(52.001, 42));
        let walk = state.into_recovered_walk(Utc::now()).unwrap();
        assert!(walk.recovered);
        assert_eq!(walk.ended_at, fix(0.0, 42).timestamp);
    }

    #[test]
    fn draft_round_trips_through_json() {
        let mut state = active();
        state.record_fix(fix(52.001, 3));
        state.tick();

        let raw = serde_json::to_string(&state).unwrap();
        let restored: WalkState = serde_json::from_str(&raw).unwrap();
        assert_eq!(restored.snapshot(), state.snapshot());
    }
}
