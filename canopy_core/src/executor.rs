// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry executors.
//!
//! An executor translates a node's geometry, visibility and stacking changes
//! into display operations. Display-backed nodes use [`NativeExecutor`],
//! which issues [`DisplayBackend`] calls for the node's own surface. Every
//! other node uses [`VirtualExecutor`]: it has nothing to show on its own, so
//! it carries its children along instead, applying its own position delta to
//! each child's placement through the child's executor.
//!
//! [`sync`] applies one [`SceneChanges`] set in a fixed order: removals,
//! additions, reparents, reshapes, hides, shows, then stacking.

use alloc::vec::Vec;

use tracing::{trace, warn};

use crate::backend::DisplayBackend;
use crate::error::BackendError;
use crate::geometry::Point;
use crate::policy::DestroyOrigin;
use crate::scene::{NodeId, RemovedNode, SceneChanges, ShellTree, StackOp};

/// Per-node-kind strategy for pushing changes to the display.
///
/// Placements are relative to the nearest display-backed ancestor. Visibility
/// gating is done by evaluation: `show` and `hide` are only called on
/// transitions of effective visibility.
pub trait GeoExecutor: Sync {
    /// Places the node at `placement` and stores it in the tree.
    fn update_place(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    );

    /// Applies a new size.
    fn update_size(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        width: u32,
        height: u32,
    );

    /// The node became effectively visible.
    fn show(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId);

    /// The node stopped being effectively visible.
    fn hide(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId);

    /// Raises the node within its stacking context.
    fn raise(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId);

    /// Lowers the node within its stacking context.
    fn lower(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId);

    /// The node has a new parent; `placement` is its position relative to
    /// the new nearest display-backed ancestor.
    fn update_parent(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    );

    /// The node was removed from the tree.
    fn destroy(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, removed: &RemovedNode);
}

/// Executor for nodes with no native counterpart.
#[derive(Clone, Copy, Debug, Default)]
pub struct VirtualExecutor;

/// Executor for display-backed nodes.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeExecutor;

/// Returns the executor responsible for `node`.
#[must_use]
pub fn executor_for(tree: &ShellTree, node: NodeId) -> &'static dyn GeoExecutor {
    if tree.surface(node).is_some() {
        &NativeExecutor
    } else {
        &VirtualExecutor
    }
}

fn report(result: Result<(), BackendError>) {
    if let Err(err) = result {
        warn!(%err, "display call failed");
    }
}

fn children_of(tree: &ShellTree, node: NodeId) -> Vec<NodeId> {
    tree.children(node).collect()
}

impl GeoExecutor for VirtualExecutor {
    fn update_place(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    ) {
        let Some(old) = tree.placement(node) else {
            return;
        };
        tree.set_placement(node, placement);
        let delta = placement - old;
        if delta.is_origin() {
            return;
        }
        trace!(?node, ?delta, "virtual move");
        for child in children_of(tree, node) {
            if let Some(current) = tree.placement(child) {
                executor_for(tree, child).update_place(tree, backend, child, current + delta);
            }
        }
    }

    fn update_size(&self, _: &mut ShellTree, _: &mut dyn DisplayBackend, _: NodeId, _: u32, _: u32) {}

    fn show(&self, _: &mut ShellTree, _: &mut dyn DisplayBackend, _: NodeId) {}

    fn hide(&self, _: &mut ShellTree, _: &mut dyn DisplayBackend, _: NodeId) {}

    fn raise(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        for child in children_of(tree, node) {
            executor_for(tree, child).raise(tree, backend, child);
        }
    }

    fn lower(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        // Lower in reverse so the first child ends up lowest.
        for child in children_of(tree, node).into_iter().rev() {
            executor_for(tree, child).lower(tree, backend, child);
        }
    }

    fn update_parent(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    ) {
        let Some(old) = tree.placement(node) else {
            return;
        };
        tree.set_placement(node, placement);
        let delta = placement - old;
        for child in children_of(tree, node) {
            if let Some(current) = tree.placement(child) {
                executor_for(tree, child).update_parent(tree, backend, child, current + delta);
            }
        }
    }

    fn destroy(&self, _: &mut ShellTree, _: &mut dyn DisplayBackend, _: &RemovedNode) {}
}

impl GeoExecutor for NativeExecutor {
    fn update_place(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    ) {
        tree.set_placement(node, placement);
        if let Some(surface) = tree.surface(node) {
            report(backend.place(surface, placement));
        }
    }

    fn update_size(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        width: u32,
        height: u32,
    ) {
        if let Some(surface) = tree.surface(node) {
            report(backend.resize(surface, width, height));
        }
    }

    fn show(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        if let Some(surface) = tree.surface(node) {
            report(backend.show(surface));
        }
    }

    fn hide(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        if let Some(surface) = tree.surface(node) {
            report(backend.hide(surface));
        }
    }

    fn raise(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        if let Some(surface) = tree.surface(node) {
            report(backend.raise(surface));
        }
    }

    fn lower(&self, tree: &mut ShellTree, backend: &mut dyn DisplayBackend, node: NodeId) {
        if let Some(surface) = tree.surface(node) {
            report(backend.lower(surface));
        }
    }

    fn update_parent(
        &self,
        tree: &mut ShellTree,
        backend: &mut dyn DisplayBackend,
        node: NodeId,
        placement: Point,
    ) {
        tree.set_placement(node, placement);
        if let Some(surface) = tree.surface(node) {
            let parent = tree.native_ancestor(node).and_then(|a| tree.surface(a));
            report(backend.reparent(surface, parent, placement));
        }
    }

    fn destroy(&self, _: &mut ShellTree, backend: &mut dyn DisplayBackend, removed: &RemovedNode) {
        // A surface the display already destroyed is not destroyed twice.
        if removed.origin != DestroyOrigin::Teardown {
            return;
        }
        if let Some(surface) = removed.surface {
            report(backend.destroy(surface));
        }
    }
}

/// Applies an evaluated change set to the display.
///
/// Backend failures are logged and skipped; the tree is never rolled back.
pub fn sync(tree: &mut ShellTree, backend: &mut dyn DisplayBackend, changes: &SceneChanges) {
    for removed in &changes.removed {
        let executor: &dyn GeoExecutor = if removed.surface.is_some() {
            &NativeExecutor
        } else {
            &VirtualExecutor
        };
        executor.destroy(tree, backend, removed);
    }

    // New nodes only need a placement; their surfaces already exist.
    for &node in &changes.added {
        if let Some(placement) = tree.target_placement(node) {
            tree.set_placement(node, placement);
        }
    }

    for &node in &changes.reparented {
        if let Some(placement) = tree.target_placement(node) {
            executor_for(tree, node).update_parent(tree, backend, node, placement);
        }
    }

    for reshape in &changes.reshaped {
        let node = reshape.node;
        if !tree.is_alive(node) {
            continue;
        }
        let executor = executor_for(tree, node);
        let delta = reshape.new.position() - reshape.old.position();
        // Added and reparented nodes were placed from their current shape.
        let placed = changes.added.contains(&node) || changes.reparented.contains(&node);
        if !delta.is_origin() && !placed {
            if let Some(current) = tree.placement(node) {
                executor.update_place(tree, backend, node, current + delta);
            }
        }
        if !reshape.new.same_size(reshape.old) {
            executor.update_size(tree, backend, node, reshape.new.width, reshape.new.height);
        }
    }

    for &node in &changes.hidden {
        if tree.is_alive(node) {
            executor_for(tree, node).hide(tree, backend, node);
        }
    }
    for &node in &changes.shown {
        if tree.is_alive(node) {
            executor_for(tree, node).show(tree, backend, node);
        }
    }

    for &(node, op) in &changes.stacking {
        if !tree.is_alive(node) {
            continue;
        }
        let executor = executor_for(tree, node);
        match op {
            StackOp::Raise => executor.raise(tree, backend, node),
            StackOp::Lower => executor.lower(tree, backend, node),
        }
    }
}
