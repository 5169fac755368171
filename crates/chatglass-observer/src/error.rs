//! Engine error types.
//!
//! Heuristic misses (rejected bubbles, wrong direction, missing compose
//! surface) are values, not errors; these types cover transport and
//! lifecycle failures only.

use thiserror::Error;

use crate::driver::DriverError;
use crate::scrape::ExtractError;

/// Engine-level failures surfaced by the controller.
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    /// Change-subscription setup failed. Reported once to the caller; the
    /// watcher stays inert until started again, with no retry loop.
    #[error("change subscription failed: {0}")]
    Subscribe(#[source] DriverError),

    #[error(transparent)]
    Extraction(#[from] ExtractError),
}

impl ObserverError {
    fn subscribe_source(&self) -> Option<&DriverError> {
        match self {
            ObserverError::Subscribe(e) => Some(e),
            _ => None,
        }
    }

    /// Whether this is the root-absent subscription failure.
    pub fn is_root_missing(&self) -> bool {
        matches!(
            self.subscribe_source(),
            Some(DriverError::RootMissing)
        )
    }
}
