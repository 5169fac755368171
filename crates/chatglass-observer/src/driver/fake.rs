//! In-memory page driver for unit tests. Records every side effect so
//! tests can assert on focus, input notifications and overlay lifecycles.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::dom::{NodeId, PageSnapshot};

use super::{DriverError, OverlayId, PageDriver, PageEvent};

pub(crate) struct FakePage {
    state: Mutex<FakeState>,
}

struct FakeState {
    snapshot: PageSnapshot,
    root_present: bool,
    caret_insert_supported: bool,
    fail_mount_for: HashSet<NodeId>,
    events_tx: Option<mpsc::Sender<PageEvent>>,
    snapshot_calls: usize,
    focused: Option<NodeId>,
    input_events: Vec<(NodeId, String)>,
    set_values: Vec<(NodeId, String)>,
    overlays: HashMap<OverlayId, Option<NodeId>>,
    next_overlay: OverlayId,
}

impl FakePage {
    pub fn new(snapshot: PageSnapshot) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                snapshot,
                root_present: true,
                caret_insert_supported: true,
                fail_mount_for: HashSet::new(),
                events_tx: None,
                snapshot_calls: 0,
                focused: None,
                input_events: Vec::new(),
                set_values: Vec::new(),
                overlays: HashMap::new(),
                next_overlay: 1,
            }),
        })
    }

    pub fn set_snapshot(&self, snapshot: PageSnapshot) {
        self.state.lock().snapshot = snapshot;
    }

    pub fn set_root_present(&self, present: bool) {
        self.state.lock().root_present = present;
    }

    pub fn set_caret_insert_supported(&self, supported: bool) {
        self.state.lock().caret_insert_supported = supported;
    }

    pub fn fail_mount_for(&self, node: NodeId) {
        self.state.lock().fail_mount_for.insert(node);
    }

    pub async fn emit(&self, event: PageEvent) {
        let tx = self.state.lock().events_tx.clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// Live subscriptions: one while a receiver is attached and alive.
    pub fn active_subscriptions(&self) -> usize {
        match &self.state.lock().events_tx {
            Some(tx) if !tx.is_closed() => 1,
            _ => 0,
        }
    }

    pub fn snapshot_calls(&self) -> usize {
        self.state.lock().snapshot_calls
    }

    pub fn overlay_count(&self) -> usize {
        self.state.lock().overlays.len()
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.state.lock().focused
    }

    pub fn input_events(&self) -> Vec<(NodeId, String)> {
        self.state.lock().input_events.clone()
    }

    pub fn set_values(&self) -> Vec<(NodeId, String)> {
        self.state.lock().set_values.clone()
    }
}

#[async_trait]
impl PageDriver for FakePage {
    async fn snapshot(&self) -> Result<PageSnapshot, DriverError> {
        let mut state = self.state.lock();
        state.snapshot_calls += 1;
        Ok(state.snapshot.clone())
    }

    async fn events(&self) -> Result<mpsc::Receiver<PageEvent>, DriverError> {
        let mut state = self.state.lock();
        if !state.root_present {
            return Err(DriverError::RootMissing);
        }
        let (tx, rx) = mpsc::channel(16);
        state.events_tx = Some(tx);
        Ok(rx)
    }

    async fn focus(&self, node: NodeId) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.snapshot.contains(node) {
            return Err(DriverError::NodeGone(node));
        }
        state.focused = Some(node);
        Ok(())
    }

    async fn insert_text_at_caret(&self, node: NodeId, text: &str) -> Result<bool, DriverError> {
        let mut state = self.state.lock();
        if !state.snapshot.contains(node) {
            return Err(DriverError::NodeGone(node));
        }
        if !state.caret_insert_supported {
            return Ok(false);
        }
        state.input_events.push((node, text.to_string()));
        Ok(true)
    }

    async fn set_field_value(&self, node: NodeId, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        if !state.snapshot.contains(node) {
            return Err(DriverError::NodeGone(node));
        }
        state.set_values.push((node, text.to_string()));
        // The native setter path dispatches a synthetic input notification.
        state.input_events.push((node, text.to_string()));
        Ok(())
    }

    async fn mount_overlay(&self, anchor: Option<NodeId>) -> Result<OverlayId, DriverError> {
        let mut state = self.state.lock();
        if let Some(node) = anchor {
            if !state.snapshot.contains(node) {
                return Err(DriverError::NodeGone(node));
            }
            if state.fail_mount_for.contains(&node) {
                return Err(DriverError::Transport("mount refused".to_string()));
            }
        }
        let id = state.next_overlay;
        state.next_overlay += 1;
        state.overlays.insert(id, anchor);
        Ok(id)
    }

    async fn remove_overlay(&self, overlay: OverlayId) -> Result<(), DriverError> {
        let mut state = self.state.lock();
        match state.overlays.remove(&overlay) {
            Some(_) => Ok(()),
            None => Err(DriverError::OverlayGone(overlay)),
        }
    }
}
