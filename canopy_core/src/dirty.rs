// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Canopy uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! find the nodes a flush has to look at. Each channel represents an
//! independent category of change.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`VISIBILITY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) with dependency edges from
//!   child to parent. Flipping a node's flag marks its whole subtree, because
//!   effective visibility is inherited. Reparenting marks the moved subtree
//!   the same way.
//!
//! - **Local-only**: [`SHAPE`] is marked with the default policy. Children
//!   never see a parent's shape change through the tracker; geometry reaches
//!   them through the executors.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on create, destroy and reparent.
//!   It triggers a traversal-order rebuild during evaluation.
//!
//! # Consumption
//!
//! [`ShellTree::evaluate`](crate::scene::ShellTree::evaluate) drains all
//! channels and surfaces the results as
//! [`SceneChanges`](crate::scene::SceneChanges).

use understory_dirty::Channel;

/// Visible flag or ancestry changed; effective visibility must be recomputed
/// for the subtree.
pub const VISIBILITY: Channel = Channel::new(0);

/// Local shape changed.
pub const SHAPE: Channel = Channel::new(1);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(2);
