// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene evaluation and change tracking.
//!
//! Evaluation follows a drain-recompute pattern for each dirty channel:
//!
//! 1. **TOPOLOGY**: drain, and rebuild the traversal order if the tree
//!    changed shape.
//! 2. **VISIBILITY**: drain the affected set and recompute
//!    `effective_visible = visible && parent.effective_visible` in
//!    parent-before-child order. Only transitions are reported.
//! 3. **SHAPE**: drain and diff each node's shape against the one seen by the
//!    previous evaluation.
//!
//! Lifecycle, reparent and stacking records accumulated by the mutation API
//! are moved into the same [`SceneChanges`].

use alloc::vec::Vec;

use hashbrown::HashSet;

use super::id::{INVALID, NodeId};
use super::store::{RemovedNode, ShellTree};
use crate::dirty;
use crate::geometry::Rect;

/// A stacking operation recorded by [`ShellTree::raise`] or
/// [`ShellTree::lower`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackOp {
    /// Move to the top of the stacking context.
    Raise,
    /// Move to the bottom of the stacking context.
    Lower,
}

/// A shape change, with the shape the display last saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reshape {
    /// The reshaped node.
    pub node: NodeId,
    /// Shape at the previous evaluation.
    pub old: Rect,
    /// Current shape.
    pub new: Rect,
}

/// The set of changes produced by a single [`ShellTree::evaluate`] call.
///
/// [`executor::sync`](crate::executor::sync) applies it to a display.
#[derive(Clone, Debug, Default)]
pub struct SceneChanges {
    /// Nodes whose shape changed.
    pub reshaped: Vec<Reshape>,
    /// Nodes moved under a new parent, in the order the moves happened.
    pub reparented: Vec<NodeId>,
    /// Nodes that became effectively visible, parents first.
    pub shown: Vec<NodeId>,
    /// Nodes that stopped being effectively visible, parents first.
    pub hidden: Vec<NodeId>,
    /// Raise and lower operations in request order.
    pub stacking: Vec<(NodeId, StackOp)>,
    /// Nodes created since the last evaluate.
    pub added: Vec<NodeId>,
    /// Nodes destroyed since the last evaluate, children before parents.
    pub removed: Vec<RemovedNode>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
}

impl SceneChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.reshaped.clear();
        self.reparented.clear();
        self.shown.clear();
        self.hidden.clear();
        self.stacking.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing needs to reach the display.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reshaped.is_empty()
            && self.reparented.is_empty()
            && self.shown.is_empty()
            && self.hidden.is_empty()
            && self.stacking.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

impl ShellTree {
    /// Evaluates the tree, recomputing dirty properties and returning the set
    /// of changes.
    pub fn evaluate(&mut self) -> SceneChanges {
        let mut changes = SceneChanges::default();
        self.evaluate_into(&mut changes);
        changes
    }

    /// Like [`evaluate`](Self::evaluate), but reuses the caller's buffers.
    pub fn evaluate_into(&mut self, changes: &mut SceneChanges) {
        changes.clear();

        let topology = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .count();
        changes.topology_changed = topology > 0 || self.traversal_dirty;
        if self.traversal_dirty {
            self.rebuild_traversal_order();
        }

        let affected: HashSet<u32> = self
            .dirty
            .drain(dirty::VISIBILITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        if !affected.is_empty() {
            for i in 0..self.traversal_order.len() {
                let idx = self.traversal_order[i];
                if !affected.contains(&idx) {
                    continue;
                }
                let p = self.parent[idx as usize];
                let inherited = p == INVALID || self.effective_visible[p as usize];
                let now = self.visible[idx as usize] && inherited;
                let before = self.effective_visible[idx as usize];
                self.effective_visible[idx as usize] = now;
                match (before, now) {
                    (false, true) => changes.shown.push(self.id_at(idx)),
                    (true, false) => changes.hidden.push(self.id_at(idx)),
                    _ => {}
                }
            }
        }

        let shaped: Vec<u32> = self
            .dirty
            .drain(dirty::SHAPE)
            .deterministic()
            .run()
            .collect();
        for idx in shaped {
            let i = idx as usize;
            let (old, new) = (self.synced_shape[i], self.shape[i]);
            if old != new {
                self.synced_shape[i] = new;
                changes.reshaped.push(Reshape {
                    node: self.id_at(idx),
                    old,
                    new,
                });
            }
        }

        let added = core::mem::take(&mut self.pending_added);
        changes
            .added
            .extend(added.into_iter().filter(|&id| self.is_alive(id)));

        changes.removed.append(&mut self.pending_removed);

        let mut seen = HashSet::new();
        let reparented = core::mem::take(&mut self.pending_reparented);
        changes.reparented.extend(
            reparented
                .into_iter()
                .filter(|&id| self.is_alive(id) && seen.insert(id)),
        );

        let stacking = core::mem::take(&mut self.pending_stacking);
        changes
            .stacking
            .extend(stacking.into_iter().filter(|&(id, _)| self.is_alive(id)));
    }

    /// Returns the current traversal order (depth-first pre-order from the
    /// root), as of the last evaluation.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    fn rebuild_traversal_order(&mut self) {
        let mut order = core::mem::take(&mut self.traversal_order);
        order.clear();
        self.dfs_collect(self.root, &mut order);
        self.traversal_order = order;
        self.traversal_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;
    use crate::policy::DestroyOrigin;
    use crate::scene::NodeKind;

    fn tree() -> ShellTree {
        ShellTree::new(None, Rect::new(0, 0, 800, 600))
    }

    fn widget(tree: &mut ShellTree, parent: NodeId) -> NodeId {
        tree.create_node(parent, NodeKind::Widget, None, Rect::new(0, 0, 10, 10))
            .unwrap()
    }

    fn check_effective(tree: &ShellTree, id: NodeId) {
        let own = tree.visible(id).unwrap();
        let inherited = tree
            .parent(id)
            .is_none_or(|p| tree.effective_visible(p).unwrap());
        assert_eq!(
            tree.effective_visible(id).unwrap(),
            own && inherited,
            "effective visibility of {id:?}"
        );
        for child in tree.children(id) {
            check_effective(tree, child);
        }
    }

    #[test]
    fn no_change_evaluate_returns_empty() {
        let mut tree = tree();
        let _ = tree.evaluate();
        let changes = tree.evaluate();
        assert!(changes.is_empty());
        assert!(!changes.topology_changed);
    }

    #[test]
    fn new_nodes_are_added_but_not_shown() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let changes = tree.evaluate();
        assert_eq!(changes.added, [root, a]);
        assert!(changes.shown.is_empty());
        assert!(changes.topology_changed);
    }

    #[test]
    fn showing_chain_reports_parents_first() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let b = widget(&mut tree, a);
        let _ = tree.evaluate();

        tree.set_visible(b, true).unwrap();
        tree.set_visible(a, true).unwrap();
        tree.set_visible(root, true).unwrap();
        let changes = tree.evaluate();
        assert_eq!(changes.shown, [root, a, b]);
        assert!(changes.hidden.is_empty());
    }

    #[test]
    fn hidden_parent_gates_children() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        tree.set_visible(a, true).unwrap();
        let changes = tree.evaluate();
        assert!(changes.shown.is_empty(), "root is still hidden");
        assert_eq!(tree.effective_visible(a), Some(false));

        tree.set_visible(root, true).unwrap();
        let changes = tree.evaluate();
        assert_eq!(changes.shown, [root, a]);

        tree.set_visible(root, false).unwrap();
        let changes = tree.evaluate();
        assert_eq!(changes.hidden, [root, a]);
    }

    #[test]
    fn only_transitions_are_reported() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        tree.set_visible(root, true).unwrap();
        tree.set_visible(a, true).unwrap();
        let _ = tree.evaluate();

        tree.set_visible(a, false).unwrap();
        tree.set_visible(a, true).unwrap();
        let changes = tree.evaluate();
        assert!(changes.shown.is_empty());
        assert!(changes.hidden.is_empty());
    }

    #[test]
    fn invisible_child_stays_hidden_when_parent_shows() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let b = widget(&mut tree, a);
        tree.set_visible(a, true).unwrap();
        let _ = tree.evaluate();

        tree.set_visible(root, true).unwrap();
        let changes = tree.evaluate();
        assert_eq!(changes.shown, [root, a]);
        assert_eq!(tree.effective_visible(b), Some(false));
    }

    #[test]
    fn effective_visibility_invariant_holds_across_mutations() {
        let mut tree = tree();
        let root = tree.root();
        let mut nodes = Vec::from([root]);
        for i in 0..12 {
            let parent = nodes[i / 2];
            nodes.push(widget(&mut tree, parent));
        }
        for (i, &id) in nodes.iter().enumerate() {
            tree.set_visible(id, i % 3 != 1).unwrap();
        }
        let _ = tree.evaluate();
        check_effective(&tree, root);

        tree.set_visible(nodes[1], true).unwrap();
        tree.set_visible(nodes[2], false).unwrap();
        tree.reparent(nodes[9], nodes[2]).unwrap();
        tree.reparent(nodes[5], nodes[8]).unwrap();
        let _ = tree.evaluate();
        check_effective(&tree, root);
    }

    #[test]
    fn reparent_under_hidden_parent_hides() {
        let mut tree = tree();
        let root = tree.root();
        let shown = widget(&mut tree, root);
        let hidden = widget(&mut tree, root);
        let n = widget(&mut tree, shown);
        tree.set_visible(root, true).unwrap();
        tree.set_visible(shown, true).unwrap();
        tree.set_visible(n, true).unwrap();
        let _ = tree.evaluate();
        assert_eq!(tree.effective_visible(n), Some(true));

        tree.reparent(n, hidden).unwrap();
        let changes = tree.evaluate();
        assert_eq!(changes.hidden, [n]);
        assert_eq!(changes.reparented, [n]);
    }

    #[test]
    fn reshape_reports_old_shape_once() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let _ = tree.evaluate();

        tree.configure(a, Rect::new(1, 1, 10, 10)).unwrap();
        tree.configure(a, Rect::new(5, 5, 20, 20)).unwrap();
        let changes = tree.evaluate();
        assert_eq!(
            changes.reshaped,
            [Reshape {
                node: a,
                old: Rect::new(0, 0, 10, 10),
                new: Rect::new(5, 5, 20, 20),
            }]
        );

        // Setting the same shape again is not a change.
        tree.configure(a, Rect::new(5, 5, 20, 20)).unwrap();
        assert!(tree.evaluate().reshaped.is_empty());
    }

    #[test]
    fn created_and_destroyed_in_one_batch() {
        let mut tree = tree();
        let root = tree.root();
        let _ = tree.evaluate();
        let a = widget(&mut tree, root);
        tree.destroy(a, DestroyOrigin::Teardown).unwrap();

        let changes = tree.evaluate();
        assert!(changes.added.is_empty());
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(changes.removed[0].id, a);
    }

    #[test]
    fn traversal_order_is_depth_first() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let b = widget(&mut tree, root);
        let a1 = widget(&mut tree, a);
        let _ = tree.evaluate();
        assert_eq!(
            tree.traversal_order(),
            [root.index(), a.index(), a1.index(), b.index()]
        );
    }

    #[test]
    fn evaluate_into_reuses_buffer() {
        let mut tree = tree();
        let root = tree.root();
        let a = widget(&mut tree, root);
        let mut changes = SceneChanges::default();
        tree.evaluate_into(&mut changes);
        assert!(changes.added.contains(&a));

        tree.configure(a, Rect::new(3, 3, 3, 3)).unwrap();
        tree.evaluate_into(&mut changes);
        assert!(changes.added.is_empty());
        assert_eq!(changes.reshaped.len(), 1);
    }
}
