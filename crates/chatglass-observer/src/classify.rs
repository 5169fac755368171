//! Incoming-message bubble classifier.
//!
//! An explicit ordered heuristic over one element and its rendered geometry.
//! First matching rejection wins, cheap checks first; no scoring. False
//! positives and negatives are expected and tolerated downstream.

use crate::dom::{NodeId, PageSnapshot};
use crate::overlay::HOST_MARKER_ATTR;

/// Minimum trimmed visible text length for a plausible message.
pub const MIN_TEXT_CHARS: usize = 5;
/// Anything taller is a page-level container, not a bubble.
pub const MAX_BUBBLE_HEIGHT: f64 = 300.0;
/// Anything wider is a page-level container, not a bubble.
pub const MAX_BUBBLE_WIDTH: f64 = 600.0;
/// Message bubbles are near-leaf nodes.
pub const MAX_BLOCK_CHILDREN: usize = 2;

/// Why an element was rejected. The order of checks is the order of these
/// variants' rules, not of the enum itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Element left the tree between notification and rescan.
    Detached,
    /// The element is, or sits inside, an injected overlay host.
    OverlayHost,
    /// Trimmed visible text is shorter than [`MIN_TEXT_CHARS`].
    TextTooShort,
    /// Taller or wider than a plausible bubble.
    OversizedContainer,
    /// Left edge is on the outgoing side of the layout.
    OutgoingSide,
    /// Native text control or contenteditable surface (the compose box).
    EditableSurface,
    /// More than [`MAX_BLOCK_CHILDREN`] visible block children.
    StructuralContainer,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::Detached => "detached",
            RejectReason::OverlayHost => "overlay_host",
            RejectReason::TextTooShort => "text_too_short",
            RejectReason::OversizedContainer => "oversized_container",
            RejectReason::OutgoingSide => "outgoing_side",
            RejectReason::EditableSurface => "editable_surface",
            RejectReason::StructuralContainer => "structural_container",
        }
    }
}

/// Accepted element, with the measurements the decision was made on.
/// Transient: built for one classification call and dropped.
#[derive(Debug, Clone)]
pub struct BubbleCandidate {
    pub node: NodeId,
    pub text: String,
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub block_children: usize,
}

/// Decide whether `id` is a plausible incoming-message bubble.
pub fn classify(page: &PageSnapshot, id: NodeId) -> Result<BubbleCandidate, RejectReason> {
    let Some(node) = page.node(id) else {
        return Err(RejectReason::Detached);
    };

    // Rule 1: never classify our own injected surfaces.
    if node.attributes.get(HOST_MARKER_ATTR).is_some()
        || page
            .ancestors(id)
            .any(|a| a.attributes.get(HOST_MARKER_ATTR).is_some())
    {
        return Err(RejectReason::OverlayHost);
    }

    // Rule 2: too little text to be a message.
    let text = page.visible_text(id);
    if text.chars().count() < MIN_TEXT_CHARS {
        return Err(RejectReason::TextTooShort);
    }

    // Rule 3: whole-page containers.
    let bbox = &node.bounding_box;
    if bbox.height > MAX_BUBBLE_HEIGHT || bbox.width > MAX_BUBBLE_WIDTH {
        return Err(RejectReason::OversizedContainer);
    }

    // Rule 4: incoming messages hug the left third of the viewport.
    if bbox.left() >= page.viewport().incoming_side_limit() {
        return Err(RejectReason::OutgoingSide);
    }

    // Rule 5: the compose box is not a message.
    if node.is_editable() {
        return Err(RejectReason::EditableSurface);
    }

    // Rule 6: structural containers hold many blocks; bubbles do not.
    let block_children = page.visible_block_children(id);
    if block_children > MAX_BLOCK_CHILDREN {
        return Err(RejectReason::StructuralContainer);
    }

    Ok(BubbleCandidate {
        node: id,
        text,
        width: bbox.width,
        height: bbox.height,
        left: bbox.left(),
        block_children,
    })
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
