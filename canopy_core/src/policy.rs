// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Destroy policy and the stock request policy.

use tracing::debug;

use crate::error::SceneError;
use crate::event::{EventKind, NodeEvent, Request};
use crate::scene::ShellTree;

/// What happens to the children of a destroyed node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DestroyPolicy {
    /// Destroy the whole subtree, children before parents.
    #[default]
    Cascade,
    /// Move every direct child under the root, keeping its absolute
    /// position, then destroy only the node.
    ReparentToRoot,
}

/// Who initiated a node's destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DestroyOrigin {
    /// The shell tore the node down; its native surface must be destroyed.
    Teardown,
    /// The display reported the surface gone; nothing is left to destroy.
    Notified,
}

/// Listener that applies every request verbatim.
///
/// Subscribe it for all nodes to get a shell with no placement policy:
///
/// ```
/// # use canopy_core::event::EventBus;
/// # use canopy_core::policy::apply_requests;
/// let mut bus = EventBus::new();
/// bus.subscribe(None, apply_requests);
/// ```
///
/// Requests that can no longer be applied (stale target, cycle) are logged
/// and dropped.
pub fn apply_requests(tree: &mut ShellTree, event: &NodeEvent) {
    let EventKind::Request(request) = event.kind else {
        return;
    };
    let node = event.node;
    let result = match request {
        Request::Move(position) => tree
            .shape(node)
            .ok_or(SceneError::Destroyed(node))
            .and_then(|shape| tree.configure(node, shape.with_position(position))),
        Request::Resize { width, height } => tree
            .shape(node)
            .ok_or(SceneError::Destroyed(node))
            .and_then(|shape| tree.configure(node, shape.with_size(width, height))),
        Request::Raise => tree.raise(node),
        Request::Lower => tree.lower(node),
        Request::Show => tree.set_visible(node, true),
        Request::Hide => tree.set_visible(node, false),
        Request::Reparent(parent) => tree.reparent(node, parent),
    };
    if let Err(err) = result {
        debug!(%err, ?node, ?request, "request not applied");
    }
}
