//! Change-watching building blocks: the debounce timer and the
//! processed-element set. The watcher loop itself lives in
//! [`crate::observer`], which owns the single driver subscription.

mod debounce;
mod processed;

pub use debounce::Debouncer;
pub use processed::ProcessedSet;
