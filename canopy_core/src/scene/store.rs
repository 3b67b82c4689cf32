// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use tracing::{debug, trace};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::evaluate::StackOp;
use super::id::{INVALID, NodeId, NodeKind, SurfaceHandle};
use super::traverse::Children;
use crate::dirty;
use crate::error::SceneError;
use crate::event::{EventKind, NodeEvent, Notification, Request};
use crate::geometry::{Point, Rect};
use crate::policy::{DestroyOrigin, DestroyPolicy};

/// A node removed from the tree since the last evaluation.
///
/// The handle is the one the node had while it was alive; it no longer
/// validates against the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RemovedNode {
    /// The node's last live handle.
    pub id: NodeId,
    /// What the node was.
    pub kind: NodeKind,
    /// The native surface backing the node, if any.
    pub surface: Option<SurfaceHandle>,
    /// Who initiated the teardown.
    pub origin: DestroyOrigin,
}

/// Struct-of-arrays storage for a single-rooted tree of shell nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Every mutating or requesting
/// operation on a destroyed node fails with [`SceneError::Destroyed`] and
/// has no side effects; read-only queries return `None`.
#[derive(Debug)]
pub struct ShellTree {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) root: u32,

    // -- Local properties (set by listeners) --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) surface: Vec<Option<SurfaceHandle>>,
    pub(crate) shape: Vec<Rect>,
    pub(crate) visible: Vec<bool>,

    // -- Computed properties --
    pub(crate) effective_visible: Vec<bool>,
    pub(crate) placement: Vec<Point>,
    /// Shape as of the last evaluation; reshapes are reported against it.
    pub(crate) synced_shape: Vec<Rect>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<NodeId>,
    pub(crate) pending_removed: Vec<RemovedNode>,
    pub(crate) pending_reparented: Vec<NodeId>,
    pub(crate) pending_stacking: Vec<(NodeId, StackOp)>,

    // -- Events awaiting dispatch --
    pub(crate) pending_events: VecDeque<NodeEvent>,

    destroy_policy: DestroyPolicy,
}

impl ShellTree {
    /// Creates a tree holding only its root node, using the default
    /// [`DestroyPolicy`].
    ///
    /// Pass the display's root surface as `root_surface` when the root is a
    /// native window; `None` makes it a virtual root.
    #[must_use]
    pub fn new(root_surface: Option<SurfaceHandle>, shape: Rect) -> Self {
        Self::with_policy(root_surface, shape, DestroyPolicy::default())
    }

    /// Creates a tree holding only its root node.
    #[must_use]
    pub fn with_policy(
        root_surface: Option<SurfaceHandle>,
        shape: Rect,
        destroy_policy: DestroyPolicy,
    ) -> Self {
        let mut tree = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            root: INVALID,
            kind: Vec::new(),
            surface: Vec::new(),
            shape: Vec::new(),
            visible: Vec::new(),
            effective_visible: Vec::new(),
            placement: Vec::new(),
            synced_shape: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending_reparented: Vec::new(),
            pending_stacking: Vec::new(),
            pending_events: VecDeque::new(),
            destroy_policy,
        };
        let root = tree.alloc(NodeKind::Root, root_surface, shape);
        tree.root = root;
        tree.dirty.mark_with(root, dirty::VISIBILITY, &EagerPolicy);
        tree
    }

    // -- Allocation API --

    /// Creates a new invisible node as the last child of `parent`.
    ///
    /// `shape` is relative to the parent's origin. A node with a `surface`
    /// is display-backed.
    pub fn create_node(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        surface: Option<SurfaceHandle>,
        shape: Rect,
    ) -> Result<NodeId, SceneError> {
        let p = self.validate(parent)?;
        if kind == NodeKind::Root {
            return Err(SceneError::DuplicateRoot);
        }
        let idx = self.alloc(kind, surface, shape);
        self.link_last(p, idx);
        let id = self.id_at(idx);
        debug!(node = ?id, ?parent, ?kind, ?surface, "node created");
        Ok(id)
    }

    /// Creates a display-backed [`NodeKind::Surface`] node under `parent`.
    pub fn create_surface(
        &mut self,
        parent: NodeId,
        surface: SurfaceHandle,
        shape: Rect,
    ) -> Result<NodeId, SceneError> {
        self.create_node(parent, NodeKind::Surface, Some(surface), shape)
    }

    /// Marks a node destroyed.
    ///
    /// Children are handled according to the tree's [`DestroyPolicy`]. Every
    /// destroyed node posts an [`EventKind::Destroyed`] event and shows up in
    /// [`SceneChanges::removed`](super::SceneChanges::removed) after the next
    /// evaluation.
    pub fn destroy(&mut self, id: NodeId, origin: DestroyOrigin) -> Result<(), SceneError> {
        let idx = self.validate(id)?;
        if idx == self.root {
            return Err(SceneError::RootDestroy);
        }
        match self.destroy_policy {
            DestroyPolicy::Cascade => {
                for node in self.collect_post_order(idx) {
                    self.release(node, origin);
                }
            }
            DestroyPolicy::ReparentToRoot => {
                let root_position = self.absolute_at(self.root);
                let mut child = self.first_child[idx as usize];
                while child != INVALID {
                    let next = self.next_sibling[child as usize];
                    let position = self.absolute_at(child) - root_position;
                    let c = child as usize;
                    self.shape[c] = self.shape[c].with_position(position);
                    self.synced_shape[c] = self.synced_shape[c].with_position(position);
                    self.move_under(child, self.root);
                    child = next;
                }
                self.release(idx, origin);
            }
        }
        Ok(())
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        // Destroy and slot reuse both bump the generation, so a freed slot
        // never matches a handed-out id.
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    /// Returns whether the node has been destroyed.
    #[must_use]
    pub fn is_destroyed(&self, id: NodeId) -> bool {
        !self.is_alive(id)
    }

    /// Returns the number of live nodes, root included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    // -- Topology API --

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.id_at(self.root)
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// The node is unlinked from its old parent before it is linked into the
    /// new one and keeps its shape, which is now relative to `new_parent`.
    /// Reparenting under the current parent is a no-op.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        let c = self.validate(child)?;
        let p = self.validate(new_parent)?;
        if c == self.root {
            return Err(SceneError::RootReparent);
        }
        let mut cursor = p;
        while cursor != INVALID {
            if cursor == c {
                return Err(SceneError::Cycle {
                    node: child,
                    parent: new_parent,
                });
            }
            cursor = self.parent[cursor as usize];
        }
        if self.parent[c as usize] == p {
            return Ok(());
        }
        self.move_under(c, p);
        debug!(node = ?child, parent = ?new_parent, "node reparented");
        Ok(())
    }

    /// Returns the parent of a node; `None` for the root or a destroyed node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.live_index(id)?;
        let p = self.parent[idx];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children of a node.
    ///
    /// A destroyed node has no children.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let first = self
            .live_index(id)
            .map_or(INVALID, |idx| self.first_child[idx]);
        Children::new(self, first)
    }

    /// Returns the nearest strict ancestor backed by a native surface.
    #[must_use]
    pub fn native_ancestor(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.live_index(id)?;
        let mut cursor = self.parent[idx];
        while cursor != INVALID {
            if self.surface[cursor as usize].is_some() {
                return Some(self.id_at(cursor));
            }
            cursor = self.parent[cursor as usize];
        }
        None
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns what kind of node this is.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.live_index(id).map(|idx| self.kind[idx])
    }

    /// Returns the native surface backing the node, if any.
    #[must_use]
    pub fn surface(&self, id: NodeId) -> Option<SurfaceHandle> {
        self.live_index(id).and_then(|idx| self.surface[idx])
    }

    /// Returns the node's shape, relative to its parent.
    #[must_use]
    pub fn shape(&self, id: NodeId) -> Option<Rect> {
        self.live_index(id).map(|idx| self.shape[idx])
    }

    /// Returns the node's local visible flag.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> Option<bool> {
        self.live_index(id).map(|idx| self.visible[idx])
    }

    /// Returns whether the node and all of its ancestors are visible.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_visible(&self, id: NodeId) -> Option<bool> {
        self.live_index(id).map(|idx| self.effective_visible[idx])
    }

    /// Returns the node's position relative to its nearest display-backed
    /// ancestor, as last applied by the executors.
    #[must_use]
    pub fn placement(&self, id: NodeId) -> Option<Point> {
        self.live_index(id).map(|idx| self.placement[idx])
    }

    /// Returns the node's position in display coordinates.
    ///
    /// Computed from the shapes along the ancestry, so it reflects
    /// mutations that have not been flushed yet.
    #[must_use]
    pub fn absolute_position(&self, id: NodeId) -> Option<Point> {
        self.is_alive(id).then(|| self.absolute_at(id.idx))
    }

    /// Returns the policy applied to children of destroyed nodes.
    #[must_use]
    pub fn destroy_policy(&self) -> DestroyPolicy {
        self.destroy_policy
    }

    /// Replaces the policy applied to children of destroyed nodes.
    pub fn set_destroy_policy(&mut self, policy: DestroyPolicy) {
        self.destroy_policy = policy;
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the node's shape.
    ///
    /// Marks the SHAPE channel. Children are not notified here; a moved
    /// virtual node carries its children along during the executor pass.
    pub fn configure(&mut self, id: NodeId, shape: Rect) -> Result<(), SceneError> {
        let idx = self.validate(id)?;
        self.shape[idx as usize] = shape;
        self.dirty.mark(idx, dirty::SHAPE);
        Ok(())
    }

    /// Sets the node's local visible flag.
    ///
    /// Marks the VISIBILITY channel with eager propagation to descendants.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> Result<(), SceneError> {
        let idx = self.validate(id)?;
        if self.visible[idx as usize] != visible {
            self.visible[idx as usize] = visible;
            self.dirty.mark_with(idx, dirty::VISIBILITY, &EagerPolicy);
        }
        Ok(())
    }

    /// Records a raise to the top of the node's stacking context.
    pub fn raise(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.validate(id)?;
        self.pending_stacking.push((id, StackOp::Raise));
        Ok(())
    }

    /// Records a lower to the bottom of the node's stacking context.
    pub fn lower(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.validate(id)?;
        self.pending_stacking.push((id, StackOp::Lower));
        Ok(())
    }

    /// Adopts geometry reported by the display for a display-backed node.
    ///
    /// `native` is relative to the nearest display-backed ancestor. Shape and
    /// placement are updated in place without marking SHAPE, so the next
    /// flush does not echo the change back to the display.
    pub fn sync_native_geometry(&mut self, id: NodeId, native: Rect) -> Result<(), SceneError> {
        let idx = self.validate(id)?;
        if self.surface[idx as usize].is_none() {
            return Err(SceneError::NotDisplayBacked(id));
        }
        let base = self.placement_base(self.parent[idx as usize]);
        let shape = native.with_position(native.position() - base);
        let i = idx as usize;
        self.shape[i] = shape;
        self.synced_shape[i] = shape;
        self.placement[i] = native.position();
        trace!(node = ?id, ?native, "native geometry adopted");
        Ok(())
    }

    // -- Request API (posts events, never mutates) --

    /// Asks for the node to move to `(x, y)` relative to its parent.
    pub fn request_move(&mut self, id: NodeId, x: i32, y: i32) -> Result<(), SceneError> {
        self.post_request(id, Request::Move(Point::new(x, y)))
    }

    /// Asks for the node to be resized.
    pub fn request_resize(&mut self, id: NodeId, width: u32, height: u32) -> Result<(), SceneError> {
        self.post_request(id, Request::Resize { width, height })
    }

    /// Asks for the node to be raised.
    pub fn request_raise(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.post_request(id, Request::Raise)
    }

    /// Asks for the node to be lowered.
    pub fn request_lower(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.post_request(id, Request::Lower)
    }

    /// Asks for the node to be shown.
    pub fn request_show(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.post_request(id, Request::Show)
    }

    /// Asks for the node to be hidden.
    pub fn request_hide(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.post_request(id, Request::Hide)
    }

    /// Asks for the node to be moved under `new_parent`.
    pub fn request_reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), SceneError> {
        self.validate(new_parent)?;
        self.post_request(id, Request::Reparent(new_parent))
    }

    /// Posts a display notification to the node's listeners.
    pub fn post_notification(
        &mut self,
        id: NodeId,
        notification: Notification,
    ) -> Result<(), SceneError> {
        self.validate(id)?;
        self.pending_events.push_back(NodeEvent {
            node: id,
            kind: EventKind::Notify(notification),
        });
        Ok(())
    }

    /// Returns the number of events waiting for dispatch.
    #[must_use]
    pub fn pending_event_count(&self) -> usize {
        self.pending_events.len()
    }

    // -- Crate-internal accessors --

    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    pub(crate) fn pop_event(&mut self) -> Option<NodeEvent> {
        self.pending_events.pop_front()
    }

    pub(crate) fn discard_events(&mut self) -> usize {
        let n = self.pending_events.len();
        self.pending_events.clear();
        n
    }

    /// Stores the placement computed by an executor.
    pub(crate) fn set_placement(&mut self, id: NodeId, placement: Point) {
        if let Some(idx) = self.live_index(id) {
            self.placement[idx] = placement;
        }
    }

    /// Returns the origin that a child of `parent` is placed against: the
    /// parent's own placement when it is virtual, zero when it is native.
    pub(crate) fn placement_base(&self, parent: u32) -> Point {
        if parent == INVALID || self.surface[parent as usize].is_some() {
            Point::ORIGIN
        } else {
            self.placement[parent as usize]
        }
    }

    /// Placement a node should have given its current shape and parent.
    pub(crate) fn target_placement(&self, id: NodeId) -> Option<Point> {
        let idx = self.live_index(id)?;
        Some(self.shape[idx].position() + self.placement_base(self.parent[idx]))
    }

    // -- Internal helpers --

    fn validate(&self, id: NodeId) -> Result<u32, SceneError> {
        if self.is_alive(id) {
            Ok(id.idx)
        } else {
            Err(SceneError::Destroyed(id))
        }
    }

    fn live_index(&self, id: NodeId) -> Option<usize> {
        self.is_alive(id).then_some(id.idx as usize)
    }

    fn absolute_at(&self, idx: u32) -> Point {
        let mut position = Point::ORIGIN;
        let mut cursor = idx;
        while cursor != INVALID {
            position += self.shape[cursor as usize].position();
            cursor = self.parent[cursor as usize];
        }
        position
    }

    fn post_request(&mut self, id: NodeId, request: Request) -> Result<(), SceneError> {
        self.validate(id)?;
        trace!(node = ?id, ?request, "request posted");
        self.pending_events.push_back(NodeEvent {
            node: id,
            kind: EventKind::Request(request),
        });
        Ok(())
    }

    fn alloc(&mut self, kind: NodeKind, surface: Option<SurfaceHandle>, shape: Rect) -> u32 {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] = self.generation[i].wrapping_add(1);
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.surface[i] = surface;
            self.shape[i] = shape;
            self.visible[i] = false;
            self.effective_visible[i] = false;
            self.placement[i] = shape.position();
            self.synced_shape[i] = shape;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.surface.push(surface);
            self.shape.push(shape);
            self.visible.push(false);
            self.effective_visible.push(false);
            self.placement.push(shape.position());
            self.synced_shape.push(shape);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(self.id_at(idx));
        self.dirty.mark(idx, dirty::TOPOLOGY);
        idx
    }

    /// Frees a single slot. Children must already be gone or moved.
    fn release(&mut self, idx: u32, origin: DestroyOrigin) {
        let id = self.id_at(idx);
        let i = idx as usize;
        let p = self.parent[i];
        if p != INVALID {
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        self.dirty.remove_key(idx);

        self.pending_removed.push(RemovedNode {
            id,
            kind: self.kind[i],
            surface: self.surface[i],
            origin,
        });

        // Bump generation so old handles immediately fail validation.
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.visible[i] = false;
        self.effective_visible[i] = false;
        self.free_list.push(idx);
        self.traversal_dirty = true;

        self.pending_events.push_back(NodeEvent {
            node: id,
            kind: EventKind::Destroyed,
        });
        debug!(node = ?id, ?origin, "node destroyed");
    }

    /// Unlinks `c` from its parent and appends it under `p`.
    fn move_under(&mut self, c: u32, p: u32) {
        let old = self.parent[c as usize];
        if old != INVALID {
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, old, dirty::VISIBILITY);
            self.dirty.mark(old, dirty::TOPOLOGY);
        }
        self.link_last(p, c);
        self.pending_reparented.push(self.id_at(c));
    }

    /// Appends `c` as the last child of `p`.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child depends on parent for effective visibility.
        let _ = self.dirty.add_dependency(c, p, dirty::VISIBILITY);
        self.dirty.mark_with(c, dirty::VISIBILITY, &EagerPolicy);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
