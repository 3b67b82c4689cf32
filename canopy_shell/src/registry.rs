// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Native handle to node mapping.

use std::collections::HashMap;
use std::sync::Arc;

use canopy_core::scene::{NodeId, SurfaceHandle};
use parking_lot::Mutex;
use tracing::trace;

/// Maps native surface handles to the nodes they back.
///
/// Cloning shares the map. The shell thread writes it when surfaces are
/// attached or removed; the event dispatcher reads it to resolve targets.
#[derive(Clone, Debug, Default)]
pub struct SurfaceRegistry {
    inner: Arc<Mutex<HashMap<SurfaceHandle, NodeId>>>,
}

impl SurfaceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `surface` backs `node`, returning the node it backed
    /// before, if any.
    pub fn register(&self, surface: SurfaceHandle, node: NodeId) -> Option<NodeId> {
        trace!(?surface, ?node, "surface registered");
        self.inner.lock().insert(surface, node)
    }

    /// Forgets `surface` if it still maps to `node`.
    ///
    /// A handle the display reused for a newer node is left alone.
    pub fn unregister(&self, surface: SurfaceHandle, node: NodeId) -> bool {
        let mut map = self.inner.lock();
        if map.get(&surface) == Some(&node) {
            map.remove(&surface);
            trace!(?surface, ?node, "surface unregistered");
            true
        } else {
            false
        }
    }

    /// Returns the node backed by `surface`.
    #[must_use]
    pub fn lookup(&self, surface: SurfaceHandle) -> Option<NodeId> {
        self.inner.lock().get(&surface).copied()
    }

    /// Returns the number of registered surfaces.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if no surface is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
