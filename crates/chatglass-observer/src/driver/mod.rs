//! The seam between the engine and the live page.
//!
//! Everything above this trait is pure logic over [`PageSnapshot`]s; the
//! production implementation speaks the DevTools protocol, and tests use an
//! in-memory page.

pub mod cdp;
#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

use crate::dom::{NodeId, PageSnapshot};

use cdp::CdpError;

/// Identifier of a mounted overlay host, scoped to one driver.
pub type OverlayId = u64;

/// One batch of structure mutations inside the observed subtree.
#[derive(Debug, Clone, Default)]
pub struct MutationBatch {
    /// Roots of newly inserted element subtrees.
    pub added: Vec<NodeId>,
    /// Elements reported removed. Advisory: removal handling keys off
    /// snapshot presence, not this list.
    pub removed: Vec<NodeId>,
}

impl MutationBatch {
    pub fn added(ids: impl Into<Vec<NodeId>>) -> Self {
        Self {
            added: ids.into(),
            removed: Vec::new(),
        }
    }

    pub fn removed(ids: impl Into<Vec<NodeId>>) -> Self {
        Self {
            added: Vec::new(),
            removed: ids.into(),
        }
    }
}

/// Change notifications delivered by the driver.
#[derive(Debug, Clone)]
pub enum PageEvent {
    Mutations(MutationBatch),
    /// The address changed without a document reload (soft navigation) or
    /// the document was replaced outright.
    Navigated(Url),
}

/// Driver failures. Heuristic misses are not errors; these are transport
/// and lifecycle problems.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("page transport error: {0}")]
    Transport(String),

    /// The observation root (the document body) is not present.
    #[error("observation root not present")]
    RootMissing,

    /// The element is no longer part of the page tree.
    #[error("element {0} is gone")]
    NodeGone(NodeId),

    #[error("overlay {0} is not mounted")]
    OverlayGone(OverlayId),
}

impl From<CdpError> for DriverError {
    fn from(e: CdpError) -> Self {
        DriverError::Transport(e.to_string())
    }
}

/// Operations the engine needs from a live page.
///
/// All methods are best-effort views of a mutating document; callers treat
/// stale ids as expected, not exceptional.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Capture a fresh snapshot of the page tree, address and viewport.
    async fn snapshot(&self) -> Result<PageSnapshot, DriverError>;

    /// Subscribe to change notifications rooted at the page body. Fails
    /// with [`DriverError::RootMissing`] when the root is absent; callers
    /// report that once and stay inert rather than retrying.
    async fn events(&self) -> Result<mpsc::Receiver<PageEvent>, DriverError>;

    /// Focus an element.
    async fn focus(&self, node: NodeId) -> Result<(), DriverError>;

    /// Insert text at the caret of the focused editable surface through the
    /// host page's own input pipeline. `Ok(false)` means the mechanism is
    /// unavailable on this surface.
    async fn insert_text_at_caret(&self, node: NodeId, text: &str) -> Result<bool, DriverError>;

    /// Set a conventional form field's value through the native property
    /// setter and dispatch a synthetic input notification. Never used as a
    /// bare value assignment.
    async fn set_field_value(&self, node: NodeId, text: &str) -> Result<(), DriverError>;

    /// Create an isolated overlay host attached to `anchor`, or to the
    /// document-level sidebar anchor when `anchor` is `None`.
    async fn mount_overlay(&self, anchor: Option<NodeId>) -> Result<OverlayId, DriverError>;

    /// Remove a previously mounted overlay host.
    async fn remove_overlay(&self, overlay: OverlayId) -> Result<(), DriverError>;
}
