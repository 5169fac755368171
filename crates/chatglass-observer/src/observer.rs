//! The observer controller.
//!
//! One controller owns the single change-notification subscription, the
//! processed-element set and the overlay map for the life of a page, so
//! repeated initialization can never create duplicate subscriptions.
//! `start` is idempotent; `stop` detaches the subscription outright rather
//! than gating a flag.

use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::classify::classify;
use crate::config::ObserverConfig;
use crate::dom::{NodeId, PageSnapshot};
use crate::driver::{PageDriver, PageEvent};
use crate::error::ObserverError;
use crate::inject;
use crate::overlay::{OverlayAnchor, OverlayManager};
use crate::platform::Platform;
use crate::scrape::{self, Extraction};
use crate::watch::{Debouncer, ProcessedSet};

/// Point-in-time controller state, for callers and tests.
#[derive(Debug, Clone)]
pub struct ObserverStatus {
    pub running: bool,
    pub platform: Platform,
    pub mounted_overlays: usize,
    pub processed_elements: usize,
}

struct EngineState {
    processed: ProcessedSet,
    overlays: OverlayManager,
    platform: Platform,
}

struct ControllerInner {
    driver: Arc<dyn PageDriver>,
    config: ObserverConfig,
    state: Mutex<EngineState>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Handle to the engine. Cheap to clone; all clones share one controller.
#[derive(Clone)]
pub struct ObserverController {
    inner: Arc<ControllerInner>,
}

impl ObserverController {
    pub fn new(driver: Arc<dyn PageDriver>, config: ObserverConfig) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                driver,
                config,
                state: Mutex::new(EngineState {
                    processed: ProcessedSet::new(),
                    overlays: OverlayManager::new(),
                    platform: Platform::Unknown,
                }),
                task: Mutex::new(None),
            }),
        }
    }

    /// Subscribe and begin watching. Starting while already running is a
    /// no-op, not a second subscription. Subscription setup failure is
    /// returned once and the controller stays inert until started again.
    pub async fn start(&self) -> Result<(), ObserverError> {
        let mut slot = self.inner.task.lock().await;
        if slot.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("observer already running");
            return Ok(());
        }
        let events = self
            .inner
            .driver
            .events()
            .await
            .map_err(ObserverError::Subscribe)?;
        info!("observer started");
        let inner = self.inner.clone();
        *slot = Some(tokio::spawn(run_loop(inner, events)));
        Ok(())
    }

    /// Detach the subscription, destroy every mounted overlay and clear the
    /// processed set. A later `start` begins from a full fresh scan.
    pub async fn stop(&self) {
        let was_running = {
            let mut slot = self.inner.task.lock().await;
            match slot.take() {
                Some(task) => {
                    task.abort();
                    true
                }
                None => false,
            }
        };

        let mut state = self.inner.state.lock().await;
        let removed = state.overlays.clear(self.inner.driver.as_ref()).await;
        state.processed.clear();
        state.platform = Platform::Unknown;
        if was_running {
            info!(overlays_removed = removed, "observer stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    pub async fn status(&self) -> ObserverStatus {
        let running = self.is_running().await;
        let state = self.inner.state.lock().await;
        ObserverStatus {
            running,
            platform: state.platform,
            mounted_overlays: state.overlays.len(),
            processed_elements: state.processed.len(),
        }
    }

    /// Extract the most recent incoming message from the live page.
    pub async fn scrape_last_incoming(&self) -> Result<Extraction, ObserverError> {
        let snapshot = self.inner.driver.snapshot().await?;
        let platform = Platform::resolve(snapshot.url());
        Ok(scrape::scrape_last_incoming(platform, &snapshot)?)
    }

    /// Write text into the current platform's compose surface.
    pub async fn insert_text(&self, text: &str) -> Result<bool, ObserverError> {
        let snapshot = self.inner.driver.snapshot().await?;
        let platform = Platform::resolve(snapshot.url());
        Ok(inject::insert_text(
            self.inner.driver.as_ref(),
            &snapshot,
            platform.strategy(),
            text,
        )
        .await?)
    }

    /// Explicit user close of one overlay.
    pub async fn close_overlay(&self, anchor: OverlayAnchor) -> Result<bool, ObserverError> {
        let mut state = self.inner.state.lock().await;
        Ok(state
            .overlays
            .close(self.inner.driver.as_ref(), anchor)
            .await?)
    }

    /// Follow the privacy flag: `true` fully disengages, `false` re-engages
    /// with a fresh scan. Applies the current value immediately, then
    /// tracks changes until the sender goes away.
    pub fn bind_privacy(&self, mut rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            loop {
                let paused = *rx.borrow_and_update();
                if paused {
                    info!("privacy flag set, disengaging");
                    controller.stop().await;
                } else if let Err(e) = controller.start().await {
                    warn!(error = %e, "could not engage observer");
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

async fn run_loop(inner: Arc<ControllerInner>, mut events: mpsc::Receiver<PageEvent>) {
    let mut pending: Vec<NodeId> = Vec::new();
    let mut bubble = Debouncer::new(inner.config.debounce);
    let mut view = Debouncer::new(inner.config.debounce);

    // Fresh starts (and resumes) begin with one full scan; nothing carries
    // over from a previous run.
    rescan(&inner, None).await;
    ensure_sidebar(&inner).await;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PageEvent::Mutations(batch)) => {
                    if !batch.added.is_empty() {
                        pending.extend(batch.added.iter().copied());
                        bubble.arm();
                    }
                    // The coarse chat-detection watcher debounces on any
                    // mutation, additions or not.
                    view.arm();
                }
                Some(PageEvent::Navigated(url)) => {
                    handle_navigation(&inner, &url).await;
                    pending.clear();
                    bubble.disarm();
                    view.arm();
                }
                None => {
                    info!("change notification stream ended");
                    break;
                }
            },
            _ = bubble.fired(), if bubble.is_armed() => {
                bubble.disarm();
                let roots = std::mem::take(&mut pending);
                rescan(&inner, Some(&roots)).await;
            }
            _ = view.fired(), if view.is_armed() => {
                view.disarm();
                ensure_sidebar(&inner).await;
            }
        }
    }
}

/// Replace the platform context when the address has changed under us.
fn sync_platform(state: &mut EngineState, snapshot: &PageSnapshot) {
    let resolved = Platform::resolve(snapshot.url());
    if resolved != state.platform {
        info!(from = %state.platform, to = %resolved, "platform context replaced");
        state.platform = resolved;
    }
}

/// One debounce-triggered rescan. `roots` limits the pass to the
/// accumulated added subtrees; `None` scans the whole document.
async fn rescan(inner: &ControllerInner, roots: Option<&[NodeId]>) {
    let snapshot = match inner.driver.snapshot().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "rescan skipped, snapshot failed");
            return;
        }
    };

    let mut state = inner.state.lock().await;
    sync_platform(&mut state, &snapshot);

    let pruned = state.processed.retain_present(&snapshot);
    if pruned > 0 {
        trace!(pruned, "pruned processed entries for detached elements");
    }
    // Anchor-removal detection is opportunistic, here, not polled.
    state
        .overlays
        .sweep(inner.driver.as_ref(), &snapshot)
        .await;

    let targets: Vec<NodeId> = match roots {
        None => snapshot.document_order().collect(),
        Some(roots) => {
            let mut seen = std::collections::HashSet::new();
            let mut ids: Vec<NodeId> = roots
                .iter()
                .flat_map(|&r| snapshot.subtree(r))
                .filter(|&id| seen.insert(id))
                .collect();
            ids.sort_by_key(|&id| snapshot.order_index(id).unwrap_or(usize::MAX));
            ids
        }
    };

    for id in targets {
        if state.processed.contains(id) {
            continue;
        }
        // Marked before any mount, so a re-entrant notification landing
        // mid-rescan cannot double-process the element.
        state.processed.mark(id);
        match classify(&snapshot, id) {
            Ok(candidate) => {
                debug!(
                    node = id,
                    chars = candidate.text.chars().count(),
                    left = candidate.left,
                    "bubble accepted"
                );
                if let Err(e) = state
                    .overlays
                    .mount(inner.driver.as_ref(), OverlayAnchor::Bubble(id))
                    .await
                {
                    // One element failing must not abort the batch.
                    warn!(node = id, error = %e, "bubble overlay mount failed");
                }
            }
            Err(reason) => trace!(node = id, reason = reason.as_str(), "rejected"),
        }
    }
}

/// Soft navigation: the platform context is replaced wholesale and the
/// engine restarts its view of the document.
async fn handle_navigation(inner: &ControllerInner, url: &Url) {
    info!(%url, "navigation observed");
    {
        let mut state = inner.state.lock().await;
        state.platform = Platform::resolve(url);
        state.processed.clear();
    }
    rescan(inner, None).await;
}

/// Chat-detection path: mount the persistent sidebar once when a
/// qualifying chat view is present. Deliberately ignores the per-bubble
/// classification machinery.
async fn ensure_sidebar(inner: &ControllerInner) {
    if !inner.config.mount_sidebar {
        return;
    }
    let snapshot = match inner.driver.snapshot().await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "sidebar check skipped, snapshot failed");
            return;
        }
    };

    let mut state = inner.state.lock().await;
    sync_platform(&mut state, &snapshot);
    // Qualification is the resolver's thread-view check; a page that does
    // not resolve is not a chat view.
    if !state.platform.supports_messaging() {
        return;
    }
    if state.overlays.is_mounted(OverlayAnchor::Sidebar) {
        return;
    }
    match state
        .overlays
        .mount(inner.driver.as_ref(), OverlayAnchor::Sidebar)
        .await
    {
        Ok(true) => info!("sidebar mounted"),
        Ok(false) => {}
        Err(e) => warn!(error = %e, "sidebar mount failed"),
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
