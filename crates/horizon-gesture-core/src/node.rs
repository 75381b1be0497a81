//! Node arena standing in for the component tree.
//!
//! Gesture recognition only needs three things from the tree it is attached
//! to: a stable identity for each node, hit testing, and conversion of window
//! coordinates into node-local coordinates. [`NodeTree`] provides exactly
//! that on top of a [`SlotMap`], so a node that has been removed is simply a
//! lookup miss rather than a dangling reference.
//!
//! # Hit testing
//!
//! [`NodeTree::touch_test`] walks the tree front to back (later children are
//! on top) and returns the hit nodes deepest first, which is the order
//! recognizers are offered a new pointer. Each node's [`HitTestMode`] decides
//! whether it takes part and whether it hides the nodes behind or above it.

use slotmap::{SlotMap, new_key_type};

use crate::error::{GestureError, Result};
use crate::geometry::{Point, Rect};
use crate::logging::targets;

new_key_type! {
    /// A stable identifier for a node in a [`NodeTree`].
    ///
    /// The id stays valid until the node is removed; afterwards every lookup
    /// through it misses.
    pub struct NodeId;
}

/// How a node takes part in hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum HitTestMode {
    /// The node and its children respond; the node hides siblings behind it.
    #[default]
    Default,
    /// The node responds but hides its children, siblings behind it and ancestors.
    Block,
    /// The node and its children respond without hiding anything.
    Transparent,
    /// The node does not respond; its children still do.
    None,
}

/// Outcome of hit testing a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTestResult {
    /// The point is outside the node, or nothing in the subtree responded.
    OutOfRegion,
    /// Something responded; ancestors may respond as well.
    Bubbling,
    /// Something responded and ancestors must not.
    StopBubbling,
}

#[derive(Debug, Clone)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Frame relative to the parent's origin (window coordinates for roots).
    frame: Rect,
    hit_test_mode: HitTestMode,
    name: String,
}

/// Arena of nodes with parent/child links, frames and hit-test modes.
#[derive(Debug, Default)]
pub struct NodeTree {
    nodes: SlotMap<NodeId, NodeData>,
    roots: Vec<NodeId>,
}

impl NodeTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node with a frame in window coordinates.
    pub fn create_root(&mut self, frame: Rect) -> NodeId {
        let id = self.nodes.insert(NodeData {
            parent: None,
            children: Vec::new(),
            frame,
            hit_test_mode: HitTestMode::Default,
            name: String::new(),
        });
        self.roots.push(id);
        tracing::trace!(target: targets::NODE, ?id, "created root node");
        id
    }

    /// Add a child node with a frame relative to its parent.
    ///
    /// Children added later are drawn, and hit tested, on top.
    pub fn create_child(&mut self, parent: NodeId, frame: Rect) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(GestureError::NodeNotFound(parent));
        }
        let id = self.nodes.insert(NodeData {
            parent: Some(parent),
            children: Vec::new(),
            frame,
            hit_test_mode: HitTestMode::Default,
            name: String::new(),
        });
        if let Some(parent_data) = self.nodes.get_mut(parent) {
            parent_data.children.push(id);
        }
        tracing::trace!(target: targets::NODE, ?id, ?parent, "created child node");
        Ok(id)
    }

    /// Remove a node and its subtree.
    ///
    /// Returns the removed ids, descendants before their ancestors. Removing
    /// an unknown node returns an empty list.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }
        let mut removed = self.descendants(id);
        removed.push(id);

        if let Some(parent) = self.nodes.get(id).and_then(|d| d.parent) {
            if let Some(parent_data) = self.nodes.get_mut(parent) {
                parent_data.children.retain(|&child| child != id);
            }
        } else {
            self.roots.retain(|&root| root != id);
        }

        for node in &removed {
            self.nodes.remove(*node);
        }
        tracing::trace!(target: targets::NODE, ?id, removed = removed.len(), "removed node subtree");
        removed
    }

    /// Collect all descendants, deepest first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result);
        result
    }

    fn collect_descendants(&self, id: NodeId, result: &mut Vec<NodeId>) {
        let Some(data) = self.nodes.get(id) else {
            return;
        };
        for &child in &data.children {
            self.collect_descendants(child, result);
            result.push(child);
        }
    }

    /// Check if a node exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|d| d.parent)
    }

    /// Children of a node in z-order (back to front).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|d| d.children.as_slice()).unwrap_or(&[])
    }

    /// Returns true if `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Set a debug name.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) {
        if let Some(data) = self.nodes.get_mut(id) {
            data.name = name.into();
        }
    }

    /// Debug name of a node.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id).map(|d| d.name.as_str())
    }

    /// Set how a node takes part in hit testing.
    pub fn set_hit_test_mode(&mut self, id: NodeId, mode: HitTestMode) {
        if let Some(data) = self.nodes.get_mut(id) {
            data.hit_test_mode = mode;
        }
    }

    /// Hit-test mode of a node.
    pub fn hit_test_mode(&self, id: NodeId) -> Option<HitTestMode> {
        self.nodes.get(id).map(|d| d.hit_test_mode)
    }

    /// Replace a node's frame (relative to its parent).
    pub fn set_frame(&mut self, id: NodeId, frame: Rect) {
        if let Some(data) = self.nodes.get_mut(id) {
            data.frame = frame;
        }
    }

    /// Origin of a node in window coordinates.
    pub fn global_origin(&self, id: NodeId) -> Option<Point> {
        let data = self.nodes.get(id)?;
        let parent_origin = match data.parent {
            Some(parent) => self.global_origin(parent)?,
            None => Point::ZERO,
        };
        Some(parent_origin + data.frame.origin)
    }

    /// Convert a window-space point into the node's local space.
    ///
    /// Returns `None` when the node no longer exists.
    pub fn to_local(&self, id: NodeId, point: Point) -> Option<Point> {
        self.global_origin(id).map(|origin| point - origin)
    }

    /// Hit test the whole tree at a window-space point.
    ///
    /// Returns the responding nodes deepest first.
    pub fn touch_test(&self, point: Point) -> Vec<NodeId> {
        let mut result = Vec::new();
        for &root in self.roots.iter().rev() {
            let hit = self.touch_test_node(root, point, Point::ZERO, &mut result);
            if self.hides_siblings(root, hit) {
                break;
            }
        }
        result
    }

    /// Hit test only the subtree rooted at `id`.
    pub fn touch_test_subtree(&self, id: NodeId, point: Point) -> Vec<NodeId> {
        let mut result = Vec::new();
        let parent_origin = match self.parent(id) {
            Some(parent) => match self.global_origin(parent) {
                Some(origin) => origin,
                None => return result,
            },
            None => Point::ZERO,
        };
        self.touch_test_node(id, point, parent_origin, &mut result);
        result
    }

    fn hides_siblings(&self, id: NodeId, hit: HitTestResult) -> bool {
        match hit {
            HitTestResult::OutOfRegion => false,
            HitTestResult::StopBubbling => true,
            HitTestResult::Bubbling => {
                self.hit_test_mode(id) != Some(HitTestMode::Transparent)
            }
        }
    }

    fn touch_test_node(
        &self,
        id: NodeId,
        point: Point,
        parent_origin: Point,
        result: &mut Vec<NodeId>,
    ) -> HitTestResult {
        let Some(data) = self.nodes.get(id) else {
            return HitTestResult::OutOfRegion;
        };
        let frame = data.frame.translate(parent_origin);
        if !frame.contains(point) {
            return HitTestResult::OutOfRegion;
        }

        if data.hit_test_mode == HitTestMode::Block {
            result.push(id);
            return HitTestResult::StopBubbling;
        }

        let mut child_hit = false;
        for &child in data.children.iter().rev() {
            let hit = self.touch_test_node(child, point, frame.origin, result);
            if hit == HitTestResult::StopBubbling {
                return HitTestResult::StopBubbling;
            }
            if hit == HitTestResult::Bubbling {
                child_hit = true;
            }
            if self.hides_siblings(child, hit) {
                break;
            }
        }

        if data.hit_test_mode == HitTestMode::None {
            return if child_hit {
                HitTestResult::Bubbling
            } else {
                HitTestResult::OutOfRegion
            };
        }

        result.push(id);
        HitTestResult::Bubbling
    }
}
