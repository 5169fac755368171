//! A session attached to the observed chat tab.
//!
//! Implements [`PageDriver`] on top of the shared WebSocket connection:
//! snapshots come from a full `DOM.getDocument` walk with per-element
//! geometry, change notifications are translated from DOM mutation events,
//! and injection runs through the page's own editing pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace, warn};
use url::Url;

use crate::dom::{
    BoundingBox, NodeAttributes, NodeId, PageNode, PageSnapshot, SnapshotBuilder, ViewportInfo,
};
use crate::driver::{DriverError, MutationBatch, OverlayId, PageDriver, PageEvent};
use crate::overlay::HOST_MARKER_ATTR;

use super::client::{PendingRequest, WsSink};
use super::error::CdpError;
use super::protocol::{BoxModel, CdpRequest, CdpResponse, ComputedStyle, DomNode, RemoteObject};

/// Caret-preserving insertion through the page's own editing command, so
/// the host's input pipeline fires exactly as it would for typed text.
const INSERT_AT_CARET_FN: &str = r#"function(text) {
    this.focus();
    if (typeof document.execCommand !== 'function') { return false; }
    return document.execCommand('insertText', false, text);
}"#;

/// Native prototype setter plus a synthetic input event. Assigning
/// `this.value` directly would bypass the host framework's change tracking.
const SET_FIELD_VALUE_FN: &str = r#"function(text) {
    const proto = Object.getPrototypeOf(this);
    const desc = Object.getOwnPropertyDescriptor(proto, 'value');
    if (desc && desc.set) { desc.set.call(this, text); } else { this.value = text; }
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Overlay host behind a closed shadow root: the isolation boundary that
/// keeps host-page styles and ours apart.
const MOUNT_OVERLAY_FN: &str = r#"function(marker, kind) {
    const host = document.createElement('div');
    host.setAttribute(marker, kind);
    const shadow = host.attachShadow({ mode: 'closed' });
    shadow.appendChild(document.createElement('section'));
    if (kind === 'sidebar') {
        document.body.appendChild(host);
    } else {
        this.insertAdjacentElement('afterend', host);
    }
    return host;
}"#;

const REMOVE_OVERLAY_FN: &str = "function() { this.remove(); }";

/// Flattened element record from the wire tree walk.
struct ElementRecord {
    backend_id: i64,
    node_id: i64,
    tag: String,
    attributes: Vec<String>,
    text: String,
    parent: Option<i64>,
}

pub struct CdpPage {
    target_id: String,
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
    /// Raw session events, handed to the pump on first subscription.
    raw_events: Mutex<Option<mpsc::UnboundedReceiver<CdpResponse>>>,
    /// Current subscriber, replaced on every `events` call.
    event_sink: Arc<Mutex<Option<mpsc::Sender<PageEvent>>>>,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
    /// Mounted overlay hosts by id, as remote object handles.
    overlays: Mutex<HashMap<OverlayId, String>>,
    next_overlay: AtomicU64,
}

impl CdpPage {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
        raw_events: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
            raw_events: Mutex::new(Some(raw_events)),
            event_sink: Arc::new(Mutex::new(None)),
            pump: Mutex::new(None),
            overlays: Mutex::new(HashMap::new()),
            next_overlay: AtomicU64::new(1),
        }
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a CDP command scoped to this page's session.
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Enable the protocol domains the observer needs. Mutation events flow
    /// once the DOM domain is enabled and a document has been requested.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        self.call("CSS.enable", None).await?;
        debug!("enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Evaluate a JavaScript expression by value.
    async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Evaluate a JavaScript expression, keeping the handle.
    async fn evaluate_handle(&self, expression: &str) -> Result<RemoteObject, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": false,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(serde_json::from_value(result["result"].clone())?)
    }

    /// Call a function on a remote object, returning by value.
    async fn call_function_value(
        &self,
        object_id: &str,
        declaration: &str,
        args: Vec<Value>,
    ) -> Result<Value, CdpError> {
        let result = self.call_function(object_id, declaration, args, true).await?;
        Ok(result["result"]["value"].clone())
    }

    /// Call a function on a remote object, returning a handle.
    async fn call_function_handle(
        &self,
        object_id: &str,
        declaration: &str,
        args: Vec<Value>,
    ) -> Result<RemoteObject, CdpError> {
        let result = self.call_function(object_id, declaration, args, false).await?;
        Ok(serde_json::from_value(result["result"].clone())?)
    }

    async fn call_function(
        &self,
        object_id: &str,
        declaration: &str,
        args: Vec<Value>,
        by_value: bool,
    ) -> Result<Value, CdpError> {
        let arguments: Vec<Value> = args.into_iter().map(|v| json!({ "value": v })).collect();
        let result = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": declaration,
                    "arguments": arguments,
                    "returnByValue": by_value,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }

        Ok(result)
    }

    /// Resolve a backend node id to a runtime object.
    async fn resolve_backend(&self, node: NodeId) -> Result<RemoteObject, DriverError> {
        match self
            .call("DOM.resolveNode", Some(json!({"backendNodeId": node})))
            .await
        {
            Ok(result) => {
                let object: RemoteObject = serde_json::from_value(result["object"].clone())
                    .map_err(CdpError::from)?;
                Ok(object)
            }
            // The protocol reports detached/unknown nodes as a plain error.
            Err(CdpError::Protocol { .. }) => Err(DriverError::NodeGone(node)),
            Err(e) => Err(e.into()),
        }
    }

    async fn release(&self, object_id: &str) {
        let _ = self
            .call(
                "Runtime.releaseObject",
                Some(json!({"objectId": object_id})),
            )
            .await;
    }

    /// Box model for a node; `None` when it has no layout.
    async fn get_box_model(&self, node: NodeId) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"backendNodeId": node})))
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            Err(CdpError::Protocol { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Computed `display` for a node, when the style backend has it.
    async fn get_display(&self, node_id: i64) -> Option<String> {
        let result = self
            .call(
                "CSS.getComputedStyleForNode",
                Some(json!({"nodeId": node_id})),
            )
            .await
            .ok()?;
        let styles: Vec<ComputedStyle> =
            serde_json::from_value(result["computedStyle"].clone()).unwrap_or_default();
        styles
            .into_iter()
            .find(|s| s.name == "display")
            .map(|s| s.value)
    }

    async fn capture_snapshot(&self) -> Result<PageSnapshot, CdpError> {
        let href = self.evaluate("window.location.href").await?;
        let url = Url::parse(href.as_str().unwrap_or_default())?;

        let viewport_value = self
            .evaluate("({width: window.innerWidth, height: window.innerHeight, dpr: window.devicePixelRatio})")
            .await?;
        let viewport = ViewportInfo {
            width: viewport_value["width"].as_u64().unwrap_or(1280) as u32,
            height: viewport_value["height"].as_u64().unwrap_or(720) as u32,
            device_pixel_ratio: viewport_value["dpr"].as_f64().unwrap_or(1.0),
        };

        let result = self
            .call("DOM.getDocument", Some(json!({"depth": -1, "pierce": true})))
            .await?;
        let root: DomNode = serde_json::from_value(result["root"].clone())?;

        let mut records = Vec::new();
        collect_elements(&root, None, &mut records);

        let mut builder = SnapshotBuilder::new(url, viewport);
        for record in records {
            let mut node = PageNode::new(record.tag.as_str());
            node.id = record.backend_id;
            node.attributes = NodeAttributes::from_flat(&record.attributes);
            node.text = record.text;

            // Geometry and style fetches are isolated per element; a node
            // that refuses to answer just reads as not rendered.
            match self.get_box_model(record.backend_id).await {
                Ok(Some(model)) => {
                    let (x, y) = model.origin();
                    node.bounding_box =
                        BoundingBox::new(x, y, model.width as f64, model.height as f64);
                }
                Ok(None) => node.is_visible = false,
                Err(e) => {
                    trace!(node = record.backend_id, error = %e, "box model unavailable");
                    node.is_visible = false;
                }
            }
            if let Some(display) = self.get_display(record.node_id).await {
                node.display = display;
            }
            if node.display == "none" {
                node.is_visible = false;
            }

            builder.insert(record.parent, node);
        }

        Ok(builder.finish())
    }

    fn ensure_event_pump(&self) {
        let mut pump = self.pump.lock();
        if pump.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        let Some(raw) = self.raw_events.lock().take() else {
            return;
        };
        let sink = self.event_sink.clone();
        *pump = Some(tokio::spawn(pump_events(raw, sink)));
    }
}

/// Drain raw session events, translating structure mutations into engine
/// events for whichever subscriber is current. Keeps draining with no
/// subscriber so the browser-side stream never backs up.
async fn pump_events(
    mut raw: mpsc::UnboundedReceiver<CdpResponse>,
    sink: Arc<Mutex<Option<mpsc::Sender<PageEvent>>>>,
) {
    while let Some(event) = raw.recv().await {
        let Some(translated) = translate_event(&event) else {
            continue;
        };
        let tx = sink.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(translated).await;
        }
    }
    debug!("CDP event stream ended");
}

fn translate_event(resp: &CdpResponse) -> Option<PageEvent> {
    match resp.method.as_deref()? {
        "DOM.childNodeInserted" => {
            let backend = resp.params.as_ref()?["node"]["backendNodeId"].as_i64()?;
            Some(PageEvent::Mutations(MutationBatch::added(vec![backend])))
        }
        "DOM.childNodeRemoved" => {
            let node = resp.params.as_ref()?["nodeId"].as_i64().unwrap_or_default();
            Some(PageEvent::Mutations(MutationBatch::removed(vec![node])))
        }
        // Count-only updates and wholesale document swaps still need the
        // coarse watcher to take a look.
        "DOM.childNodeCountUpdated" | "DOM.documentUpdated" => {
            Some(PageEvent::Mutations(MutationBatch::default()))
        }
        "Page.frameNavigated" => {
            let frame = &resp.params.as_ref()?["frame"];
            if frame.get("parentId").is_some() {
                return None;
            }
            let url = Url::parse(frame["url"].as_str()?).ok()?;
            Some(PageEvent::Navigated(url))
        }
        _ => None,
    }
}

fn collect_elements(node: &DomNode, parent: Option<i64>, out: &mut Vec<ElementRecord>) {
    if node.node_type != DomNode::ELEMENT {
        // Document and doctype wrappers: descend without materializing.
        for child in node.children.iter().flatten() {
            collect_elements(child, parent, out);
        }
        return;
    }

    let tag = node.node_name.to_ascii_lowercase();
    if matches!(tag.as_str(), "script" | "style" | "noscript" | "head") {
        return;
    }

    let text = node
        .children
        .iter()
        .flatten()
        .filter(|c| c.node_type == DomNode::TEXT)
        .filter_map(|c| c.node_value.as_deref())
        .collect::<Vec<_>>()
        .join(" ");

    out.push(ElementRecord {
        backend_id: node.backend_node_id,
        node_id: node.node_id,
        tag,
        attributes: node.attributes.clone().unwrap_or_default(),
        text,
        parent,
    });

    let me = Some(node.backend_node_id);
    for child in node.children.iter().flatten() {
        collect_elements(child, me, out);
    }
    for shadow in node.shadow_roots.iter().flatten() {
        collect_elements(shadow, me, out);
    }
}

#[async_trait]
impl PageDriver for CdpPage {
    async fn snapshot(&self) -> Result<PageSnapshot, DriverError> {
        Ok(self.capture_snapshot().await?)
    }

    async fn events(&self) -> Result<mpsc::Receiver<PageEvent>, DriverError> {
        let body = self.evaluate("document.body !== null").await?;
        if !body.as_bool().unwrap_or(false) {
            return Err(DriverError::RootMissing);
        }

        let (tx, rx) = mpsc::channel(64);
        *self.event_sink.lock() = Some(tx);
        self.ensure_event_pump();
        Ok(rx)
    }

    async fn focus(&self, node: NodeId) -> Result<(), DriverError> {
        match self
            .call("DOM.focus", Some(json!({"backendNodeId": node})))
            .await
        {
            Ok(_) => Ok(()),
            Err(CdpError::Protocol { .. }) => Err(DriverError::NodeGone(node)),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_text_at_caret(&self, node: NodeId, text: &str) -> Result<bool, DriverError> {
        let object = self.resolve_backend(node).await?;
        let Some(object_id) = object.object_id else {
            return Err(DriverError::NodeGone(node));
        };
        let accepted = self
            .call_function_value(&object_id, INSERT_AT_CARET_FN, vec![json!(text)])
            .await
            .map_err(DriverError::from);
        self.release(&object_id).await;
        Ok(accepted?.as_bool().unwrap_or(false))
    }

    async fn set_field_value(&self, node: NodeId, text: &str) -> Result<(), DriverError> {
        let object = self.resolve_backend(node).await?;
        let Some(object_id) = object.object_id else {
            return Err(DriverError::NodeGone(node));
        };
        let result = self
            .call_function_value(&object_id, SET_FIELD_VALUE_FN, vec![json!(text)])
            .await
            .map_err(DriverError::from);
        self.release(&object_id).await;
        result.map(|_| ())
    }

    async fn mount_overlay(&self, anchor: Option<NodeId>) -> Result<OverlayId, DriverError> {
        let (anchor_object, kind) = match anchor {
            Some(node) => (self.resolve_backend(node).await?, "bubble"),
            None => (
                self.evaluate_handle("document.body")
                    .await
                    .map_err(DriverError::from)?,
                "sidebar",
            ),
        };
        let Some(anchor_id) = anchor_object.object_id else {
            return Err(DriverError::Transport(
                "anchor did not resolve to an object".to_string(),
            ));
        };

        let host = self
            .call_function_handle(
                &anchor_id,
                MOUNT_OVERLAY_FN,
                vec![json!(HOST_MARKER_ATTR), json!(kind)],
            )
            .await
            .map_err(DriverError::from);
        self.release(&anchor_id).await;

        let host = host?;
        let Some(host_id) = host.object_id else {
            return Err(DriverError::Transport(
                "overlay host did not resolve to an object".to_string(),
            ));
        };

        let overlay = self.next_overlay.fetch_add(1, Ordering::SeqCst);
        self.overlays.lock().insert(overlay, host_id);
        debug!(overlay, kind, "overlay host created");
        Ok(overlay)
    }

    async fn remove_overlay(&self, overlay: OverlayId) -> Result<(), DriverError> {
        let Some(host_id) = self.overlays.lock().remove(&overlay) else {
            return Err(DriverError::OverlayGone(overlay));
        };
        if let Err(e) = self
            .call_function_value(&host_id, REMOVE_OVERLAY_FN, vec![])
            .await
        {
            // The host may have been torn down with its anchor.
            warn!(overlay, error = %e, "overlay removal reported an error");
        }
        self.release(&host_id).await;
        Ok(())
    }
}

impl Drop for CdpPage {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.lock().take() {
            pump.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(method: &str, params: Value) -> CdpResponse {
        serde_json::from_value(json!({
            "method": method,
            "params": params,
            "sessionId": "sess"
        }))
        .unwrap()
    }

    #[test]
    fn inserted_nodes_become_added_batches() {
        let resp = event(
            "DOM.childNodeInserted",
            json!({"parentNodeId": 4, "node": {"nodeId": 9, "backendNodeId": 41,
                   "nodeType": 1, "nodeName": "DIV"}}),
        );
        match translate_event(&resp) {
            Some(PageEvent::Mutations(batch)) => {
                assert_eq!(batch.added, vec![41]);
                assert!(batch.removed.is_empty());
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn main_frame_navigation_translates() {
        let resp = event(
            "Page.frameNavigated",
            json!({"frame": {"id": "f1", "url": "https://web.whatsapp.com/"}}),
        );
        match translate_event(&resp) {
            Some(PageEvent::Navigated(url)) => {
                assert_eq!(url.as_str(), "https://web.whatsapp.com/");
            }
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn subframe_navigation_is_ignored() {
        let resp = event(
            "Page.frameNavigated",
            json!({"frame": {"id": "f2", "parentId": "f1", "url": "https://ads.example/"}}),
        );
        assert!(translate_event(&resp).is_none());
    }

    #[test]
    fn count_updates_arm_the_coarse_watcher() {
        let resp = event("DOM.childNodeCountUpdated", json!({"nodeId": 5, "childNodeCount": 3}));
        match translate_event(&resp) {
            Some(PageEvent::Mutations(batch)) => assert!(batch.added.is_empty()),
            other => panic!("unexpected translation: {other:?}"),
        }
    }

    #[test]
    fn unrelated_events_are_dropped() {
        let resp = event("Network.requestWillBeSent", json!({}));
        assert!(translate_event(&resp).is_none());
    }

    #[test]
    fn element_walk_skips_script_and_collects_text() {
        let root: DomNode = serde_json::from_value(json!({
            "nodeId": 0, "backendNodeId": 0, "nodeType": 9, "nodeName": "#document",
            "children": [{
                "nodeId": 1, "backendNodeId": 100, "nodeType": 1, "nodeName": "BODY",
                "children": [
                    {"nodeId": 2, "backendNodeId": 101, "nodeType": 1, "nodeName": "SCRIPT",
                     "children": [{"nodeId": 3, "backendNodeId": 102, "nodeType": 3,
                                   "nodeName": "#text", "nodeValue": "var x;"}]},
                    {"nodeId": 4, "backendNodeId": 103, "nodeType": 1, "nodeName": "DIV",
                     "attributes": ["class", "bubble"],
                     "children": [{"nodeId": 5, "backendNodeId": 104, "nodeType": 3,
                                   "nodeName": "#text", "nodeValue": "hello there"}]}
                ]
            }]
        }))
        .unwrap();

        let mut records = Vec::new();
        collect_elements(&root, None, &mut records);

        let tags: Vec<&str> = records.iter().map(|r| r.tag.as_str()).collect();
        assert_eq!(tags, vec!["body", "div"]);
        assert_eq!(records[1].text, "hello there");
        assert_eq!(records[1].parent, Some(100));
    }
}
