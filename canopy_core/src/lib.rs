// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shell scene graph for a modular desktop shell.
//!
//! `canopy_core` holds the on-screen hierarchy of shell nodes: virtual
//! grouping nodes, widgets, and nodes backed by a native display surface. It
//! is `no_std` compatible (with `alloc`) and stores nodes in struct-of-arrays
//! layout behind generational [`NodeId`](scene::NodeId) handles.
//!
//! # Architecture
//!
//! Mutations are recorded, not pushed. A flush turns them into one ordered
//! change set and hands it to the geometry executors, which are the only
//! code that talks to the display:
//!
//! ```text
//!   request_*() ──► NodeEvent queue ──► EventBus::dispatch() ──► listeners
//!                                                                  │
//!                  configure / set_visible / reparent / destroy ◄──┘
//!                                   │
//!                                   ▼
//!   ShellTree::evaluate() ──► SceneChanges ──► executor::sync() ──► DisplayBackend
//! ```
//!
//! **[`scene`]**: the node tree. Local properties (shape, visible flag,
//! parent) are set by listeners; effective visibility is computed by
//! evaluation, which reports only transitions.
//!
//! **[`dirty`]**: channel constants for `understory_dirty`. VISIBILITY
//! propagates to descendants; SHAPE is local; TOPOLOGY rebuilds traversal
//! order.
//!
//! **[`executor`]**: virtual and native geometry executors and the sync pass
//! that applies a [`SceneChanges`](scene::SceneChanges) set.
//!
//! **[`event`]**: node events and the subscription-based [`EventBus`](event::EventBus).
//!
//! **[`policy`]**: destroy policy and the stock request-applying listener.
//!
//! **[`binding`]**: explicit property access for view-model binding.
//!
//! **[`backend`]**: the [`DisplayBackend`](backend::DisplayBackend) trait
//! native display integrations implement.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `serde` (disabled by default): Serialization for configuration enums.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(test)]
extern crate std;

pub mod backend;
pub mod binding;
pub mod dirty;
pub mod error;
pub mod event;
pub mod executor;
pub mod geometry;
pub mod policy;
pub mod scene;
