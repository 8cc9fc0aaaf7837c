use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{
    sync::{broadcast, Mutex},
    time::{self, Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::geo::LocationPoint;
use crate::location::LocationSubscription;
use crate::storage::{keys, KeyValueStore};

use super::{WalkEvent, WalkState};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

/// Handles shared by the timer and sampler tasks of one session.
#[derive(Clone)]
pub(super) struct TrackerContext {
    pub state: Arc<Mutex<WalkState>>,
    pub events: broadcast::Sender<WalkEvent>,
    pub store: Arc<dyn KeyValueStore>,
    pub heartbeat_every_ticks: u32,
}

/// Counts one second per tick while the session is active and writes a
/// recovery draft every `heartbeat_every_ticks` seconds.
pub(super) async fn ticker_loop(
    ctx: TrackerContext,
    tick_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut interval = time::interval_at(Instant::now() + tick_interval, tick_interval);
    let heartbeat_every = ctx.heartbeat_every_ticks.max(1);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let draft = {
                    let mut guard = ctx.state.lock().await;
                    if !guard.tick() {
                        continue;
                    }
                    ticks = ticks.wrapping_add(1);
                    (ticks % heartbeat_every == 0).then(|| guard.clone())
                };

                if let Some(draft) = draft {
                    if let Err(err) = save_draft(ctx.store.as_ref(), &draft).await {
                        log_error!("failed to write walk draft: {err:#}");
                    }
                    let _ = ctx.events.send(WalkEvent::Heartbeat {
                        snapshot: draft.snapshot(),
                    });
                }
            }
            _ = cancel_token.cancelled() => {
                break;
            }
        }
    }
}

/// Drains the location feed into the session path. A feed error or a
/// closed feed stalls the session and ends the loop. On cancel, fixes that
/// were already queued are still recorded before the loop exits.
pub(super) async fn sampler_loop(
    mut subscription: LocationSubscription,
    ctx: TrackerContext,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                while let Some(Ok(fix)) = subscription.try_next() {
                    record_fix(&ctx, fix).await;
                }
                log_info!("location sampler shutting down");
                break;
            }
            next = subscription.next() => match next {
                Some(Ok(fix)) => record_fix(&ctx, fix).await,
                Some(Err(err)) => {
                    stall(&ctx, &err.to_string()).await;
                    break;
                }
                None => {
                    stall(&ctx, "location feed closed").await;
                    break;
                }
            }
        }
    }
}

async fn record_fix(ctx: &TrackerContext, fix: LocationPoint) {
    let recorded = {
        let mut guard = ctx.state.lock().await;
        guard
            .record_fix(fix)
            .map(|segment_m| (segment_m, guard.distance_m))
    };

    match recorded {
        Some((segment_m, distance_m)) => {
            let _ = ctx.events.send(WalkEvent::Position {
                fix,
                segment_m,
                distance_m,
            });
        }
        None => log_warn!(
            "ignored fix ({}, {}) at {}",
            fix.latitude,
            fix.longitude,
            fix.timestamp
        ),
    }
}

pub(super) async fn stall(ctx: &TrackerContext, reason: &str) {
    let walk_id = {
        let mut guard = ctx.state.lock().await;
        guard.mark_stalled();
        guard.walk_id.clone().unwrap_or_default()
    };

    log_warn!("walk {walk_id} stalled: {reason}; timer keeps running");
    let _ = ctx.events.send(WalkEvent::TrackingStalled {
        walk_id,
        reason: reason.to_string(),
    });
}

pub(super) async fn save_draft(store: &dyn KeyValueStore, state: &WalkState) -> Result<()> {
    let raw = serde_json::to_string(state).context("failed to serialize walk draft")?;
    store.set(keys::WALK_DRAFT, raw).await
}

pub(super) async fn load_draft(store: &dyn KeyValueStore) -> Result<Option<WalkState>> {
    match store.get(keys::WALK_DRAFT).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .context("corrupt walk draft"),
        None => Ok(None),
    }
}

pub(super) async fn clear_draft(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(keys::WALK_DRAFT).await?;
    Ok(())
}
