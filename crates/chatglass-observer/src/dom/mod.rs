//! Snapshot model of the observed page.

mod node;
mod snapshot;
mod types;

pub use node::{NodeId, PageNode};
pub use snapshot::{PageSnapshot, SnapshotBuilder};
pub use types::{BoundingBox, NodeAttributes, ViewportInfo};
