pub mod manual;
pub mod provider;

pub use manual::ManualLocationProvider;
pub use provider::{
    LocationError, LocationProvider, LocationSubscription, PermissionStatus, WatchOptions,
};
