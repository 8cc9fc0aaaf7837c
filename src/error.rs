use thiserror::Error;

use crate::walk::WalkStatus;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("location permission was not granted")]
    PermissionDenied,

    #[error("cannot {action} a walk that is {status}")]
    InvalidTransition {
        action: &'static str,
        status: WalkStatus,
    },

    #[error("storage failed: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }
}
