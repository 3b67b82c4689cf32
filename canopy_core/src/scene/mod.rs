// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shell node tree.
//!
//! A *node* is an element of the on-screen hierarchy. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: parent, first-child and sibling links forming an ordered tree
//!   with exactly one root.
//! - **Local properties** set by listeners: [`shape`](ShellTree::configure)
//!   and the [`visible`](ShellTree::set_visible) flag.
//! - **Computed properties**: effective visibility, produced by
//!   [`evaluate`](ShellTree::evaluate), and the placement relative to the
//!   nearest display-backed ancestor, maintained by the
//!   [executors](crate::executor).
//!
//! Requests (`request_move`, `request_show`, ...) never mutate; they post a
//! [`NodeEvent`](crate::event::NodeEvent) that the listener owning the
//! enforcement policy turns into mutations.

mod evaluate;
mod id;
mod store;
mod traverse;

pub use evaluate::{Reshape, SceneChanges, StackOp};
pub use id::{INVALID, NodeId, NodeKind, SurfaceHandle};
pub use store::{RemovedNode, ShellTree};
pub use traverse::Children;
