//! Overlay mount manager.
//!
//! Tracks at most one mounted overlay per anchor (checked by presence) and
//! tears overlays down when their anchor leaves the page tree. The actual
//! host node creation happens in the driver behind a style/DOM isolation
//! boundary; this module owns the bookkeeping.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dom::{NodeId, PageSnapshot};
use crate::driver::{DriverError, OverlayId, PageDriver};

/// Marker attribute carried by every injected overlay host, so the
/// classifier can refuse to re-detect our own UI.
pub const HOST_MARKER_ATTR: &str = "data-chatglass-host";

/// What an overlay is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayAnchor {
    /// Anchored to a classified bubble element.
    Bubble(NodeId),
    /// Anchored to the persistent document-level sidebar slot.
    Sidebar,
}

/// One live overlay: absent -> mounted -> absent, nothing else.
#[derive(Debug, Clone, Copy)]
pub struct MountedOverlay {
    pub overlay: OverlayId,
    pub anchor: OverlayAnchor,
}

/// Presence map of mounted overlays.
#[derive(Debug, Default)]
pub struct OverlayManager {
    mounted: HashMap<OverlayAnchor, MountedOverlay>,
}

impl OverlayManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.mounted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.is_empty()
    }

    pub fn is_mounted(&self, anchor: OverlayAnchor) -> bool {
        self.mounted.contains_key(&anchor)
    }

    /// Mount an overlay for `anchor`. A no-op returning `false` when one is
    /// already present for the same anchor.
    pub async fn mount(
        &mut self,
        driver: &dyn PageDriver,
        anchor: OverlayAnchor,
    ) -> Result<bool, DriverError> {
        if self.is_mounted(anchor) {
            return Ok(false);
        }
        let node = match anchor {
            OverlayAnchor::Bubble(id) => Some(id),
            OverlayAnchor::Sidebar => None,
        };
        let overlay = driver.mount_overlay(node).await?;
        debug!(?anchor, overlay, "overlay mounted");
        self.mounted.insert(anchor, MountedOverlay { overlay, anchor });
        Ok(true)
    }

    /// Explicit close. Returns `false` when nothing was mounted there.
    pub async fn close(
        &mut self,
        driver: &dyn PageDriver,
        anchor: OverlayAnchor,
    ) -> Result<bool, DriverError> {
        let Some(mounted) = self.mounted.remove(&anchor) else {
            return Ok(false);
        };
        driver.remove_overlay(mounted.overlay).await?;
        debug!(?anchor, overlay = mounted.overlay, "overlay closed");
        Ok(true)
    }

    /// Drop overlays whose bubble anchor is no longer in the page tree.
    /// Called opportunistically during rescans, never from a polling loop.
    /// The sidebar anchor is document-level and survives sweeps.
    pub async fn sweep(&mut self, driver: &dyn PageDriver, page: &PageSnapshot) -> usize {
        let dead: Vec<OverlayAnchor> = self
            .mounted
            .keys()
            .copied()
            .filter(|anchor| match anchor {
                OverlayAnchor::Bubble(id) => !page.contains(*id),
                OverlayAnchor::Sidebar => false,
            })
            .collect();

        let mut removed = 0;
        for anchor in dead {
            if let Some(mounted) = self.mounted.remove(&anchor) {
                // The anchor is gone; the host may already have been torn
                // down with it.
                if let Err(e) = driver.remove_overlay(mounted.overlay).await {
                    debug!(?anchor, error = %e, "overlay already detached");
                }
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, remaining = self.mounted.len(), "swept dead overlays");
        }
        removed
    }

    /// Destroy everything, e.g. when the privacy switch disengages the
    /// engine.
    pub async fn clear(&mut self, driver: &dyn PageDriver) -> usize {
        let all: Vec<MountedOverlay> = self.mounted.drain().map(|(_, m)| m).collect();
        let count = all.len();
        for mounted in all {
            if let Err(e) = driver.remove_overlay(mounted.overlay).await {
                warn!(overlay = mounted.overlay, error = %e, "failed to remove overlay");
            }
        }
        count
    }
}
