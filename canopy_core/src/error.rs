// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::string::String;

use crate::scene::{NodeId, SurfaceHandle};

/// Errors from scene-tree operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    /// The node was destroyed; the handle is stale.
    #[error("node {0:?} is destroyed")]
    Destroyed(NodeId),
    /// Reparenting would make a node its own ancestor.
    #[error("reparenting {node:?} under {parent:?} would create a cycle")]
    Cycle {
        /// The node being moved.
        node: NodeId,
        /// The requested new parent.
        parent: NodeId,
    },
    /// The root node cannot be reparented.
    #[error("the root node cannot be reparented")]
    RootReparent,
    /// The root node cannot be destroyed.
    #[error("the root node cannot be destroyed")]
    RootDestroy,
    /// A tree has exactly one root.
    #[error("a tree has exactly one root node")]
    DuplicateRoot,
    /// The operation needs a native surface and the node is virtual.
    #[error("node {0:?} is not backed by a display surface")]
    NotDisplayBacked(NodeId),
    /// No property with this name is bound.
    #[error("unknown property `{0}`")]
    UnknownProperty(String),
    /// The property cannot be written.
    #[error("property `{0}` is read-only")]
    ReadOnlyProperty(&'static str),
    /// The value has the wrong type for the property.
    #[error("property `{name}` expects a {expected} value")]
    PropertyType {
        /// Property name.
        name: &'static str,
        /// Expected value kind.
        expected: &'static str,
    },
}

/// A native display call that failed.
///
/// Non-fatal: the tree keeps its state and the failure is logged.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("backend `{op}` on {surface:?} failed: {reason}")]
pub struct BackendError {
    /// The surface the call targeted.
    pub surface: SurfaceHandle,
    /// The operation name.
    pub op: &'static str,
    /// Backend-provided description.
    pub reason: String,
}
