//! Page element node as captured into a snapshot.

use serde::{Deserialize, Serialize};

use super::types::{BoundingBox, NodeAttributes};

/// Driver-stable identifier of a page element. The CDP driver uses the
/// backend node id, which survives re-walks of the same document; synthetic
/// pages assign their own.
pub type NodeId = i64;

/// One element captured into a [`PageSnapshot`](super::PageSnapshot).
///
/// Text nodes are not materialized: an element's own character data is
/// folded into `text`, and subtree text is assembled on demand by the
/// snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageNode {
    /// Stable identifier.
    pub id: NodeId,

    /// Tag name (lowercase).
    pub tag_name: String,

    /// Element attributes.
    pub attributes: NodeAttributes,

    /// Direct text content (not from element children).
    pub text: String,

    /// Bounding box in viewport coordinates. Zero-sized when the element
    /// has no layout.
    pub bounding_box: BoundingBox,

    /// Computed `display` value.
    pub display: String,

    /// Whether the element is rendered at all.
    pub is_visible: bool,

    /// Parent element id.
    pub parent: Option<NodeId>,

    /// Child element ids, in document order.
    pub children: Vec<NodeId>,
}

impl PageNode {
    /// Create a node with layout-neutral defaults; callers fill in what the
    /// fixture or the wire walk actually knows.
    pub fn new(tag_name: impl Into<String>) -> Self {
        let tag_name = tag_name.into().to_ascii_lowercase();
        let display = default_display_for(&tag_name).to_string();
        Self {
            id: 0,
            tag_name,
            attributes: NodeAttributes::default(),
            text: String::new(),
            bounding_box: BoundingBox::default(),
            display,
            is_visible: true,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Native text-entry controls.
    pub fn is_text_control(&self) -> bool {
        matches!(self.tag_name.as_str(), "input" | "textarea" | "select")
    }

    /// Text control or `contenteditable` surface.
    pub fn is_editable(&self) -> bool {
        if self.is_text_control() {
            return true;
        }
        match self.attributes.content_editable.as_deref() {
            // A bare `contenteditable` attribute enables editing.
            Some("") | Some("true") | Some("plaintext-only") => true,
            _ => false,
        }
    }

    /// Whether the element participates in block layout.
    pub fn is_block(&self) -> bool {
        matches!(
            self.display.as_str(),
            "block" | "flex" | "grid" | "list-item" | "table" | "flow-root"
        )
    }
}

/// Initial `display` for a tag, used when a fixture or the wire walk has no
/// computed style to report.
pub(crate) fn default_display_for(tag: &str) -> &'static str {
    match tag {
        "span" | "a" | "img" | "em" | "strong" | "b" | "i" | "label" | "small" => "inline",
        "input" | "textarea" | "select" | "button" => "inline-block",
        _ => "block",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editable_detection() {
        assert!(PageNode::new("textarea").is_editable());
        assert!(PageNode::new("input").is_editable());

        let mut div = PageNode::new("div");
        assert!(!div.is_editable());
        div.attributes.content_editable = Some("true".to_string());
        assert!(div.is_editable());
        div.attributes.content_editable = Some("false".to_string());
        assert!(!div.is_editable());
        div.attributes.content_editable = Some(String::new());
        assert!(div.is_editable());
    }

    #[test]
    fn block_detection_follows_display() {
        let mut node = PageNode::new("div");
        assert!(node.is_block());
        node.display = "flex".to_string();
        assert!(node.is_block());
        node.display = "inline".to_string();
        assert!(!node.is_block());

        assert!(!PageNode::new("span").is_block());
    }
}
