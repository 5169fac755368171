//! Immutable page snapshot: the engine's view of the host document.
//!
//! A snapshot is rebuilt per rescan and discarded; nothing in the engine
//! holds element state across snapshots except plain [`NodeId`]s.

use std::collections::HashMap;

use url::Url;

use super::node::{NodeId, PageNode};
use super::types::ViewportInfo;

/// One captured page tree plus the address and viewport it was taken under.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    url: Url,
    viewport: ViewportInfo,
    nodes: HashMap<NodeId, PageNode>,
    order: Vec<NodeId>,
    order_index: HashMap<NodeId, usize>,
    root: Option<NodeId>,
}

impl PageSnapshot {
    /// Address the snapshot was captured at.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn viewport(&self) -> &ViewportInfo {
        &self.viewport
    }

    /// Root element id (the document body or its stand-in), if any element
    /// was captured at all.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&PageNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All element ids in document (pre-)order.
    pub fn document_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Position of an element in document order.
    pub fn order_index(&self, id: NodeId) -> Option<usize> {
        self.order_index.get(&id).copied()
    }

    /// The subtree rooted at `root`, in document order. Empty when the root
    /// is not part of this snapshot.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(root) {
            return out;
        }
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(node) = self.node(id) {
                // Reverse push keeps sibling order on the pop side.
                for &child in node.children.iter().rev() {
                    stack.push(child);
                }
            }
        }
        out
    }

    /// Ancestor chain from `id`'s parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = &PageNode> + '_ {
        let mut current = self.node(id).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let node = self.node(current?)?;
            current = node.parent;
            Some(node)
        })
    }

    /// Whitespace-normalized visible text of the subtree under `id`.
    /// Invisible branches contribute nothing.
    pub fn visible_text(&self, id: NodeId) -> String {
        let mut segments: Vec<&str> = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.node(current) else {
                continue;
            };
            if !node.is_visible || node.display == "none" {
                continue;
            }
            if !node.text.trim().is_empty() {
                segments.push(node.text.trim());
            }
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        let joined = segments.join(" ");
        joined.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Number of visible block-level element children of `id`.
    pub fn visible_block_children(&self, id: NodeId) -> usize {
        let Some(node) = self.node(id) else {
            return 0;
        };
        node.children
            .iter()
            .filter_map(|&c| self.node(c))
            .filter(|c| c.is_visible && c.is_block())
            .count()
    }

    /// Whether `id`'s subtree contains a descendant matching the predicate.
    pub fn has_descendant(&self, id: NodeId, pred: impl Fn(&PageNode) -> bool) -> bool {
        self.subtree(id)
            .into_iter()
            .skip(1)
            .filter_map(|d| self.node(d))
            .any(|n| pred(n))
    }

    /// All elements matching the predicate, in document order.
    pub fn find_all(&self, pred: impl Fn(&PageNode) -> bool) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.node(id).is_some_and(&pred))
            .collect()
    }
}

/// Assembles a [`PageSnapshot`] top-down.
///
/// Invariant: parents are inserted before their children and siblings in
/// document order, so the insertion sequence doubles as pre-order. Both the
/// wire walk and test fixtures naturally satisfy this.
#[derive(Debug)]
pub struct SnapshotBuilder {
    url: Url,
    viewport: ViewportInfo,
    nodes: HashMap<NodeId, PageNode>,
    order: Vec<NodeId>,
    next_id: NodeId,
}

impl SnapshotBuilder {
    pub fn new(url: Url, viewport: ViewportInfo) -> Self {
        Self {
            url,
            viewport,
            nodes: HashMap::new(),
            order: Vec::new(),
            next_id: 1,
        }
    }

    /// Insert a node under `parent`. A zero `node.id` gets the next
    /// synthetic id; non-zero ids (wire backend ids) are kept as-is.
    pub fn insert(&mut self, parent: Option<NodeId>, mut node: PageNode) -> NodeId {
        if node.id == 0 {
            node.id = self.next_id;
            self.next_id += 1;
        }
        let id = node.id;
        debug_assert!(!self.nodes.contains_key(&id), "duplicate node id {id}");
        node.parent = parent;
        node.children.clear();
        if let Some(parent_node) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent_node.children.push(id);
        }
        self.order.push(id);
        self.nodes.insert(id, node);
        id
    }

    pub fn finish(self) -> PageSnapshot {
        let order_index = self
            .order
            .iter()
            .enumerate()
            .map(|(i, &id)| (id, i))
            .collect();
        let root = self.order.first().copied();
        PageSnapshot {
            url: self.url,
            viewport: self.viewport,
            nodes: self.nodes,
            order: self.order,
            order_index,
            root,
        }
    }
}
