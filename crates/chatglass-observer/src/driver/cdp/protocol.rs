//! DevTools-protocol message and tree types, trimmed to what the observer
//! actually speaks.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CDP request message.
#[derive(Debug, Serialize)]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP response message (also carries events).
#[derive(Debug, Deserialize)]
pub struct CdpResponse {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<CdpErrorResponse>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP error in response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorResponse {
    pub code: i64,
    pub message: String,
}

/// Page info from the /json discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub title: String,
    pub url: String,
    pub web_socket_debugger_url: Option<String>,
}

/// Browser version info.
///
/// Note: the browser returns PascalCase field names for this endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserVersion {
    #[serde(rename = "Browser")]
    pub browser: String,
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
}

/// DOM node from `DOM.getDocument`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomNode {
    pub node_id: i64,
    pub backend_node_id: i64,
    pub node_type: i64,
    pub node_name: String,
    pub node_value: Option<String>,
    pub children: Option<Vec<DomNode>>,
    pub attributes: Option<Vec<String>>,
    pub shadow_roots: Option<Vec<DomNode>>,
}

impl DomNode {
    pub const ELEMENT: i64 = 1;
    pub const TEXT: i64 = 3;
}

/// Box model from `DOM.getBoxModel`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxModel {
    pub content: Vec<f64>,
    pub width: i64,
    pub height: i64,
}

impl BoxModel {
    /// Top-left corner of the content quad.
    pub fn origin(&self) -> (f64, f64) {
        if self.content.len() >= 2 {
            (self.content[0], self.content[1])
        } else {
            (0.0, 0.0)
        }
    }
}

/// Computed style entry from `CSS.getComputedStyleForNode`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedStyle {
    pub name: String,
    pub value: String,
}

/// Remote object from the Runtime domain.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub object_type: String,
    pub value: Option<Value>,
    pub object_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_without_empty_fields() {
        let request = CdpRequest {
            id: 7,
            method: "DOM.enable".to_string(),
            params: None,
            session_id: None,
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire, json!({"id": 7, "method": "DOM.enable"}));
    }

    #[test]
    fn request_carries_session_id_camel_cased() {
        let request = CdpRequest {
            id: 1,
            method: "Runtime.evaluate".to_string(),
            params: Some(json!({"expression": "1"})),
            session_id: Some("sess".to_string()),
        };
        let wire = serde_json::to_string(&request).unwrap();
        assert!(wire.contains("\"sessionId\":\"sess\""));
    }

    #[test]
    fn event_response_parses() {
        let raw = json!({
            "method": "DOM.childNodeInserted",
            "params": {"parentNodeId": 4, "node": {"nodeId": 9, "backendNodeId": 41,
                        "nodeType": 1, "nodeName": "DIV"}},
            "sessionId": "sess"
        });
        let resp: CdpResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(resp.method.as_deref(), Some("DOM.childNodeInserted"));
        assert!(resp.id.is_none());
    }

    #[test]
    fn dom_node_tree_parses() {
        let raw = json!({
            "nodeId": 1, "backendNodeId": 10, "nodeType": 1, "nodeName": "BODY",
            "attributes": ["class", "chat"],
            "children": [
                {"nodeId": 2, "backendNodeId": 11, "nodeType": 3, "nodeName": "#text",
                 "nodeValue": "hi"}
            ]
        });
        let node: DomNode = serde_json::from_value(raw).unwrap();
        assert_eq!(node.node_type, DomNode::ELEMENT);
        let children = node.children.unwrap();
        assert_eq!(children[0].node_type, DomNode::TEXT);
        assert_eq!(children[0].node_value.as_deref(), Some("hi"));
    }

    #[test]
    fn box_model_origin() {
        let model = BoxModel {
            content: vec![10.0, 20.0, 110.0, 20.0, 110.0, 60.0, 10.0, 60.0],
            width: 100,
            height: 40,
        };
        assert_eq!(model.origin(), (10.0, 20.0));
    }
}
