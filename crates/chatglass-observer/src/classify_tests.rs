use url::Url;

use super::*;
use crate::dom::{BoundingBox, PageNode, PageSnapshot, SnapshotBuilder, ViewportInfo};

/// A well-formed bubble: short text span on the left side, modest box.
fn bubble_node(text: &str) -> PageNode {
    let mut n = PageNode::new("div");
    n.text = text.to_string();
    n.bounding_box = BoundingBox::new(24.0, 400.0, 220.0, 48.0);
    n
}

fn page_with(node: PageNode) -> (PageSnapshot, crate::dom::NodeId) {
    let mut b = SnapshotBuilder::new(
        Url::parse("https://web.whatsapp.com/").unwrap(),
        ViewportInfo::default(),
    );
    let body = b.insert(None, PageNode::new("body"));
    let id = b.insert(Some(body), node);
    (b.finish(), id)
}

#[test]
fn accepts_plausible_bubble() {
    let (page, id) = page_with(bubble_node("see you at eight"));
    let candidate = classify(&page, id).expect("should accept");
    assert_eq!(candidate.node, id);
    assert_eq!(candidate.text, "see you at eight");
    assert_eq!(candidate.block_children, 0);
}

#[test]
fn rejects_detached_element() {
    let (page, _) = page_with(bubble_node("see you at eight"));
    assert_eq!(classify(&page, 9999).unwrap_err(), RejectReason::Detached);
}

#[test]
fn rejects_overlay_host_and_its_descendants() {
    let mut b = SnapshotBuilder::new(
        Url::parse("https://web.whatsapp.com/").unwrap(),
        ViewportInfo::default(),
    );
    let body = b.insert(None, PageNode::new("body"));
    let host = b.insert(Some(body), {
        let mut n = bubble_node("host with plenty of text");
        n.attributes
            .data
            .insert(HOST_MARKER_ATTR.to_string(), "bubble".to_string());
        n
    });
    let inside = b.insert(Some(host), bubble_node("inner with plenty of text"));
    let page = b.finish();

    assert_eq!(classify(&page, host).unwrap_err(), RejectReason::OverlayHost);
    assert_eq!(classify(&page, inside).unwrap_err(), RejectReason::OverlayHost);
}

#[test]
fn rejects_short_text() {
    let (page, id) = page_with(bubble_node("hi"));
    assert_eq!(classify(&page, id).unwrap_err(), RejectReason::TextTooShort);

    // Exactly five characters passes the length rule.
    let (page, id) = page_with(bubble_node("hello"));
    assert!(classify(&page, id).is_ok());
}

#[test]
fn rejects_oversized_containers() {
    let mut tall = bubble_node("a perfectly reasonable message");
    tall.bounding_box.height = 301.0;
    let (page, id) = page_with(tall);
    assert_eq!(
        classify(&page, id).unwrap_err(),
        RejectReason::OversizedContainer
    );

    let mut wide = bubble_node("a perfectly reasonable message");
    wide.bounding_box.width = 601.0;
    let (page, id) = page_with(wide);
    assert_eq!(
        classify(&page, id).unwrap_err(),
        RejectReason::OversizedContainer
    );
}

#[test]
fn rejects_right_aligned_elements() {
    let mut outgoing = bubble_node("a message from ourselves");
    // Default viewport is 1280 wide; a third is ~426.7.
    outgoing.bounding_box.x = 1280.0 / 3.0;
    let (page, id) = page_with(outgoing);
    assert_eq!(classify(&page, id).unwrap_err(), RejectReason::OutgoingSide);

    let mut incoming = bubble_node("a message from the other side");
    incoming.bounding_box.x = 1280.0 / 3.0 - 1.0;
    let (page, id) = page_with(incoming);
    assert!(classify(&page, id).is_ok());
}

#[test]
fn rejects_editable_surfaces() {
    let mut compose = bubble_node("draft text sitting in the box");
    compose.attributes.content_editable = Some("true".to_string());
    let (page, id) = page_with(compose);
    assert_eq!(
        classify(&page, id).unwrap_err(),
        RejectReason::EditableSurface
    );

    let mut input = bubble_node("draft text sitting in the box");
    input.tag_name = "textarea".to_string();
    let (page, id) = page_with(input);
    assert_eq!(
        classify(&page, id).unwrap_err(),
        RejectReason::EditableSurface
    );
}

#[test]
fn rejects_structural_containers() {
    let mut b = SnapshotBuilder::new(
        Url::parse("https://web.whatsapp.com/").unwrap(),
        ViewportInfo::default(),
    );
    let body = b.insert(None, PageNode::new("body"));
    let container = b.insert(Some(body), bubble_node("a list of several messages"));
    for _ in 0..3 {
        b.insert(Some(container), PageNode::new("div"));
    }
    let page = b.finish();
    assert_eq!(
        classify(&page, container).unwrap_err(),
        RejectReason::StructuralContainer
    );
}

#[test]
fn two_block_children_still_accepted() {
    let mut b = SnapshotBuilder::new(
        Url::parse("https://web.whatsapp.com/").unwrap(),
        ViewportInfo::default(),
    );
    let body = b.insert(None, PageNode::new("body"));
    let container = b.insert(Some(body), bubble_node("text plus a small footer"));
    b.insert(Some(container), PageNode::new("div"));
    b.insert(Some(container), PageNode::new("div"));
    // Inline children never count against the limit.
    b.insert(Some(container), PageNode::new("span"));
    let page = b.finish();
    let candidate = classify(&page, container).expect("near-leaf node accepted");
    assert_eq!(candidate.block_children, 2);
}

#[test]
fn rule_order_breaks_ties() {
    // Oversized AND right-aligned AND editable: the size rule fires first.
    let mut n = bubble_node("an enormous editable pane on the right");
    n.bounding_box = BoundingBox::new(900.0, 0.0, 900.0, 900.0);
    n.attributes.content_editable = Some("true".to_string());
    let (page, id) = page_with(n);
    assert_eq!(
        classify(&page, id).unwrap_err(),
        RejectReason::OversizedContainer
    );
}
