use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::geo::LocationPoint;

use super::provider::{
    LocationError, LocationProvider, LocationSubscription, PermissionStatus, WatchOptions,
};

const DEFAULT_BUFFER: usize = 64;

struct Watcher {
    options: WatchOptions,
    sender: mpsc::Sender<Result<LocationPoint, LocationError>>,
    last_delivered: Option<LocationPoint>,
}

struct Inner {
    permission: PermissionStatus,
    last_fix: Option<LocationPoint>,
    watchers: Vec<Watcher>,
}

/// Provider fed by the host platform: the native shell forwards the OS
/// permission result and each raw fix, and this type applies the watch
/// thresholds per subscriber.
pub struct ManualLocationProvider {
    inner: Mutex<Inner>,
    buffer: usize,
}

impl Default for ManualLocationProvider {
    fn default() -> Self {
        Self::new(PermissionStatus::Undetermined)
    }
}

impl ManualLocationProvider {
    pub fn new(permission: PermissionStatus) -> Self {
        Self {
            inner: Mutex::new(Inner {
                permission,
                last_fix: None,
                watchers: Vec::new(),
            }),
            buffer: DEFAULT_BUFFER,
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Revoking permission fails every open subscription.
    pub fn set_permission(&self, permission: PermissionStatus) {
        let revoked = {
            let mut inner = self.lock();
            inner.permission = permission;
            permission != PermissionStatus::Granted && !inner.watchers.is_empty()
        };

        if revoked {
            self.fail(LocationError::PermissionRevoked);
        }
    }

    /// Forwards a raw device fix. Returns how many subscribers received it.
    pub fn push_fix(&self, fix: LocationPoint) -> usize {
        let mut inner = self.lock();
        inner.last_fix = Some(fix);

        let mut delivered = 0;
        inner.watchers.retain_mut(|watcher| {
            if !watcher.options.admits(watcher.last_delivered.as_ref(), &fix) {
                return !watcher.sender.is_closed();
            }

            match watcher.sender.try_send(Ok(fix)) {
                Ok(()) => {
                    watcher.last_delivered = Some(fix);
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!("location subscriber is lagging; dropping fix");
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("location subscriber went away");
                    false
                }
            }
        });

        delivered
    }

    /// Delivers `error` to every subscriber and closes their feeds.
    pub fn fail(&self, error: LocationError) {
        let watchers = std::mem::take(&mut self.lock().watchers);
        for watcher in watchers {
            if watcher.sender.try_send(Err(error.clone())).is_err() {
                debug!("could not deliver location error to subscriber");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|watcher| !watcher.sender.is_closed());
        inner.watchers.len()
    }
}

#[async_trait]
impl LocationProvider for ManualLocationProvider {
    async fn request_permission(&self) -> PermissionStatus {
        self.lock().permission
    }

    async fn current_position(&self) -> Result<LocationPoint, LocationError> {
        let inner = self.lock();
        if inner.permission != PermissionStatus::Granted {
            return Err(LocationError::PermissionRevoked);
        }
        inner.last_fix.ok_or(LocationError::NoFix)
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
    ) -> Result<LocationSubscription, LocationError> {
        let mut inner = self.lock();
        if inner.permission != PermissionStatus::Granted {
            return Err(LocationError::PermissionRevoked);
        }

        let (sender, receiver) = mpsc::channel(self.buffer);
        inner.watchers.push(Watcher {
            options,
            sender,
            last_delivered: None,
        });

        Ok(LocationSubscription::new(receiver))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn unbounded() -> WatchOptions {
        WatchOptions {
            time_interval_ms: 0,
            distance_interval_m: 0.0,
        }
    }

    #[tokio::test]
    async fn delivers_fixes_to_subscribers() {
        let provider = ManualLocationProvider::granted();
        let mut sub = provider.watch_position(unbounded()).await.unwrap();

        let fix = LocationPoint::new(1.0, 2.0, Utc::now());
        assert_eq!(provider.push_fix(fix), 1);
        assert_eq!(sub.next().await, Some(Ok(fix)));
        assert_eq!(provider.current_position().await, Ok(fix));
    }

    #[tokio::test]
    async fn thresholds_are_tracked_per_subscriber() {
        let provider = ManualLocationProvider::granted();
        let mut sub = provider.watch_position(WatchOptions::default()).await.unwrap();

        let t0 = Utc::now();
        provider.push_fix(LocationPoint::new(0.0, 0.0, t0));
        // Too soon after the first delivered fix.
        assert_eq!(
            provider.push_fix(LocationPoint::new(0.001, 0.0, t0 + Duration::seconds(1))),
            0
        );
        assert_eq!(
            provider.push_fix(LocationPoint::new(0.001, 0.0, t0 + Duration::seconds(6))),
            1
        );

        assert_eq!(sub.next().await.unwrap().unwrap().latitude, 0.0);
        assert_eq!(sub.next().await.unwrap().unwrap().latitude, 0.001);
    }

    #[tokio::test]
    async fn watching_requires_permission() {
        let provider = ManualLocationProvider::default();
        assert_eq!(provider.request_permission().await, PermissionStatus::Undetermined);
        assert!(matches!(
            provider.watch_position(unbounded()).await,
            Err(LocationError::PermissionRevoked)
        ));
        assert_eq!(provider.current_position().await, Err(LocationError::PermissionRevoked));

        provider.set_permission(PermissionStatus::Granted);
        assert_eq!(provider.current_position().await, Err(LocationError::NoFix));
    }

    #[tokio::test]
    async fn revoking_permission_fails_open_feeds() {
        let provider = ManualLocationProvider::granted();
        let mut sub = provider.watch_position(unbounded()).await.unwrap();
        assert_eq!(provider.subscriber_count(), 1);

        provider.set_permission(PermissionStatus::Denied);

        assert_eq!(sub.next().await, Some(Err(LocationError::PermissionRevoked)));
        assert_eq!(sub.next().await, None);
        assert_eq!(provider.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn dropped_subscriptions_are_pruned() {
        let provider = ManualLocationProvider::granted();
        let sub = provider.watch_position(unbounded()).await.unwrap();
        drop(sub);

        assert_eq!(provider.push_fix(LocationPoint::new(0.0, 0.0, Utc::now())), 0);
        assert_eq!(provider.subscriber_count(), 0);
    }
}
