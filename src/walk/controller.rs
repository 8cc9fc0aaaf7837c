use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::location::{LocationError, LocationProvider, PermissionStatus, WatchOptions};
use crate::models::Walk;
use crate::settings::WalkSettings;
use crate::storage::KeyValueStore;

use super::{
    tracker::{
        clear_draft, load_draft, sampler_loop, save_draft, stall, ticker_loop, TrackerContext,
    },
    WalkEvent, WalkHistory, WalkSnapshot, WalkState,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct WalkConfig {
    pub tick_interval: Duration,
    pub heartbeat_every_ticks: u32,
    pub watch: WatchOptions,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self::from_settings(&WalkSettings::default())
    }
}

impl WalkConfig {
    pub fn from_settings(settings: &WalkSettings) -> Self {
        let debug_mode = std::env::var("PAWTRACK_DEBUG")
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self {
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: if debug_mode {
                1
            } else {
                settings.heartbeat_every_ticks
            },
            watch: WatchOptions {
                time_interval_ms: settings.time_interval_ms,
                distance_interval_m: settings.distance_interval_m,
            },
        }
    }
}

struct TrackingTasks {
    cancel_token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

/// Drives one walk session at a time: owns the state machine, the
/// once-per-second timer and the location sampler, and files the finished
/// walk into [`WalkHistory`].
#[derive(Clone)]
pub struct WalkController {
    state: Arc<Mutex<WalkState>>,
    provider: Arc<dyn LocationProvider>,
    store: Arc<dyn KeyValueStore>,
    history: WalkHistory,
    events: broadcast::Sender<WalkEvent>,
    tasks: Arc<Mutex<Option<TrackingTasks>>>,
    // Serializes start/pause/resume/finish/discard.
    lifecycle: Arc<Mutex<()>>,
    config: WalkConfig,
}

impl WalkController {
    pub fn new(
        provider: Arc<dyn LocationProvider>,
        store: Arc<dyn KeyValueStore>,
        config: WalkConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(WalkState::new())),
            provider,
            history: WalkHistory::new(store.clone()),
            store,
            events,
            tasks: Arc::new(Mutex::new(None)),
            lifecycle: Arc::new(Mutex::new(())),
            config,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WalkEvent> {
        self.events.subscribe()
    }

    pub fn history(&self) -> &WalkHistory {
        &self.history
    }

    pub async fn snapshot(&self) -> WalkSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn start(&self, pet_id: &str) -> Result<WalkSnapshot> {
        if pet_id.trim().is_empty() {
            return Err(Error::invalid_argument("a walk needs a pet id"));
        }

        let _lifecycle = self.lifecycle.lock().await;
        self.state.lock().await.ensure_can_start()?;

        if self.provider.request_permission().await != PermissionStatus::Granted {
            warn!("Refusing to start walk for pet {pet_id}: location permission not granted");
            return Err(Error::PermissionDenied);
        }

        let initial_fix = match self.provider.current_position().await {
            Ok(fix) => Some(fix),
            Err(LocationError::PermissionRevoked) => return Err(Error::PermissionDenied),
            Err(err) => {
                warn!("Starting walk without an initial fix: {err}");
                None
            }
        };

        let walk_id = Uuid::new_v4().to_string();
        self.state.lock().await.begin(
            walk_id.clone(),
            pet_id.to_string(),
            Utc::now(),
            initial_fix,
        )?;

        self.spawn_tracking().await;
        info!("Walk {walk_id} started for pet {pet_id}");

        Ok(self.emit_state_changed().await)
    }

    pub async fn pause(&self) -> Result<WalkSnapshot> {
        let _lifecycle = self.lifecycle.lock().await;
        self.state.lock().await.ensure_can_pause()?;

        // Stop the sampler first so fixes queued while active still count.
        self.stop_tracking().await;
        let paused = {
            let mut state = self.state.lock().await;
            state.pause()?;
            state.clone()
        };

        if let Err(err) = save_draft(self.store.as_ref(), &paused).await {
            error!("Failed to write walk draft on pause: {err:#}");
        }

        Ok(self.emit_state_changed().await)
    }

    pub async fn resume(&self) -> Result<WalkSnapshot> {
        let _lifecycle = self.lifecycle.lock().await;
        self.state.lock().await.resume()?;
        self.spawn_tracking().await;
        Ok(self.emit_state_changed().await)
    }

    /// Ends the session and records the walk. The session returns to idle
    /// even when the save fails; the draft is then kept for recovery.
    pub async fn finish(&self) -> Result<Walk> {
        let _lifecycle = self.lifecycle.lock().await;
        self.state.lock().await.ensure_can_finish()?;

        self.stop_tracking().await;
        let (walk, in_progress) = {
            let mut state = self.state.lock().await;
            let in_progress = state.clone();
            (state.finish(Utc::now())?, in_progress)
        };

        let saved = self.history.record(walk).await;
        self.state.lock().await.reset();

        match saved {
            Ok(walk) => {
                if let Err(err) = clear_draft(self.store.as_ref()).await {
                    warn!("Failed to clear walk draft: {err:#}");
                }
                info!(
                    "Walk {} finished: {:.0} m in {} s",
                    walk.id, walk.distance_m, walk.duration_secs
                );
                let _ = self.events.send(WalkEvent::WalkCompleted { walk: walk.clone() });
                self.emit_state_changed().await;
                Ok(walk)
            }
            Err(err) => {
                error!("Failed to save walk; keeping draft for recovery: {err:#}");
                if let Err(draft_err) = save_draft(self.store.as_ref(), &in_progress).await {
                    error!("Failed to keep walk draft: {draft_err:#}");
                }
                self.emit_state_changed().await;
                Err(Error::Storage(err))
            }
        }
    }

    pub async fn discard(&self) -> Result<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.state.lock().await.discard()?;
        self.stop_tracking().await;

        if let Err(err) = clear_draft(self.store.as_ref()).await {
            warn!("Failed to clear walk draft: {err:#}");
        }
        info!("Walk discarded");
        self.emit_state_changed().await;
        Ok(())
    }

    /// Turns a draft left behind by an earlier run into a recorded walk.
    pub async fn recover_draft(&self) -> Result<Option<Walk>> {
        let _lifecycle = self.lifecycle.lock().await;
        let status = self.state.lock().await.status;
        if status.is_in_progress() {
            return Err(Error::InvalidTransition {
                action: "recover",
                status,
            });
        }

        let draft = match load_draft(self.store.as_ref()).await {
            Ok(Some(draft)) => draft,
            Ok(None) => return Ok(None),
            Err(err) => {
                warn!("Dropping unreadable walk draft: {err:#}");
                clear_draft(self.store.as_ref()).await?;
                return Ok(None);
            }
        };

        if !draft.status.is_in_progress() {
            clear_draft(self.store.as_ref()).await?;
            return Ok(None);
        }

        let walk = match draft.into_recovered_walk(Utc::now()) {
            Ok(walk) => walk,
            Err(err) => {
                warn!("Dropping incomplete walk draft: {err}");
                clear_draft(self.store.as_ref()).await?;
                return Ok(None);
            }
        };

        // A walk that was saved before its draft could be cleared is final.
        if self.history.get(&walk.pet_id, &walk.id).await?.is_some() {
            info!("Walk {} already recorded; dropping its stale draft", walk.id);
            clear_draft(self.store.as_ref()).await?;
            return Ok(None);
        }

        let walk = self.history.record(walk).await?;
        clear_draft(self.store.as_ref()).await?;
        warn!(
            "Recovered unfinished walk {} for pet {} ({:.0} m)",
            walk.id, walk.pet_id, walk.distance_m
        );

        Ok(Some(walk))
    }

    fn tracker_context(&self) -> TrackerContext {
        TrackerContext {
            state: self.state.clone(),
            events: self.events.clone(),
            store: self.store.clone(),
            heartbeat_every_ticks: self.config.heartbeat_every_ticks,
        }
    }

    async fn spawn_tracking(&self) {
        let mut tasks = self.tasks.lock().await;
        if let Some(previous) = tasks.take() {
            previous.cancel_token.cancel();
            for handle in previous.handles {
                handle.abort();
            }
        }

        let ctx = self.tracker_context();
        let cancel_token = CancellationToken::new();
        let mut handles = vec![tokio::spawn(ticker_loop(
            ctx.clone(),
            self.config.tick_interval,
            cancel_token.clone(),
        ))];

        match self.provider.watch_position(self.config.watch).await {
            Ok(subscription) => {
                handles.push(tokio::spawn(sampler_loop(
                    subscription,
                    ctx,
                    cancel_token.clone(),
                )));
            }
            Err(err) => stall(&ctx, &err.to_string()).await,
        }

        *tasks = Some(TrackingTasks {
            cancel_token,
            handles,
        });
    }

    async fn stop_tracking(&self) {
        let Some(tasks) = self.tasks.lock().await.take() else {
            return;
        };

        tasks.cancel_token.cancel();
        for handle in tasks.handles {
            if let Err(err) = handle.await {
                error!("Walk tracking task failed to join: {err}");
            }
        }
    }

    async fn emit_state_changed(&self) -> WalkSnapshot {
        let snapshot = self.snapshot().await;
        let _ = self.events.send(WalkEvent::StateChanged {
            snapshot: snapshot.clone(),
        });
        snapshot
    }
}
