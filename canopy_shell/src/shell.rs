// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-display shell state.

use core::fmt;

use canopy_core::backend::DisplayBackend;
use canopy_core::error::SceneError;
use canopy_core::event::{ConfigureRequest, EventBus, NodeEvent, Notification, Subscription};
use canopy_core::executor;
use canopy_core::geometry::Rect;
use canopy_core::policy::DestroyOrigin;
use canopy_core::scene::{NodeId, SceneChanges, ShellTree, SurfaceHandle};
use tracing::{debug, trace};

use crate::{ShellConfig, SurfaceRegistry};

/// Everything the shell thread owns for one display.
pub struct Shell {
    tree: ShellTree,
    bus: EventBus,
    backend: Box<dyn DisplayBackend + Send>,
    registry: SurfaceRegistry,
    changes: SceneChanges,
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("tree", &self.tree)
            .field("bus", &self.bus)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Shell {
    /// Creates a shell whose tree holds only the root.
    ///
    /// A display-backed root is registered under `root_surface`.
    pub fn new(
        config: &ShellConfig,
        root_surface: Option<SurfaceHandle>,
        root_shape: Rect,
        backend: impl DisplayBackend + Send + 'static,
    ) -> Self {
        let tree = ShellTree::with_policy(root_surface, root_shape, config.destroy_policy);
        let registry = SurfaceRegistry::new();
        if let Some(surface) = root_surface {
            registry.register(surface, tree.root());
        }
        Self {
            tree,
            bus: EventBus::with_max_deliveries(config.max_deliveries_per_flush),
            backend: Box::new(backend),
            registry,
            changes: SceneChanges::default(),
        }
    }

    /// Returns the scene tree.
    #[must_use]
    pub fn tree(&self) -> &ShellTree {
        &self.tree
    }

    /// Returns the scene tree for mutation. Changes reach the display on the
    /// next [`flush`](Self::flush).
    pub fn tree_mut(&mut self) -> &mut ShellTree {
        &mut self.tree
    }

    /// Returns the handle-to-node registry shared with the event pump.
    #[must_use]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Registers a listener for `target`, or for every node if `None`.
    pub fn subscribe<F>(&mut self, target: Option<NodeId>, listener: F) -> Subscription
    where
        F: FnMut(&mut ShellTree, &NodeEvent) + Send + 'static,
    {
        self.bus.subscribe(target, listener)
    }

    /// Removes a listener.
    pub fn unsubscribe(&mut self, token: Subscription) -> bool {
        self.bus.unsubscribe(token)
    }

    /// Adds a node for an existing native surface and registers the handle.
    pub fn attach_surface(
        &mut self,
        parent: NodeId,
        surface: SurfaceHandle,
        shape: Rect,
    ) -> Result<NodeId, SceneError> {
        let node = self.tree.create_surface(parent, surface, shape)?;
        if let Some(previous) = self.registry.register(surface, node) {
            debug!(?surface, ?previous, ?node, "surface handle reassigned");
        }
        Ok(node)
    }

    /// Applies a display notification to `node` and posts it to the node's
    /// listeners.
    ///
    /// Geometry is adopted without echoing it back to the display. A destroy
    /// notification destroys the node without a native destroy call; the
    /// root cannot be destroyed this way and its listeners see nothing.
    /// Redirected client requests are posted after the notification as the
    /// matching `request_*` events, so the request policy decides them. A
    /// created surface is attached under `node` unless its handle is already
    /// registered.
    pub fn deliver(&mut self, node: NodeId, notification: Notification) -> Result<(), SceneError> {
        match notification {
            Notification::Geometry(rect) => {
                self.tree.sync_native_geometry(node, rect)?;
                self.tree
                    .post_notification(node, Notification::Geometry(rect))
            }
            Notification::Destroy => {
                if node == self.tree.root() {
                    return Err(SceneError::RootDestroy);
                }
                self.tree.post_notification(node, Notification::Destroy)?;
                self.tree.destroy(node, DestroyOrigin::Notified)
            }
            Notification::MapRequest => {
                self.tree.post_notification(node, Notification::MapRequest)?;
                self.tree.request_show(node)
            }
            Notification::ConfigureRequest(request) => {
                self.tree
                    .post_notification(node, Notification::ConfigureRequest(request))?;
                self.forward_configure(node, request)
            }
            Notification::SurfaceCreated { surface, shape } => {
                self.tree
                    .post_notification(node, Notification::SurfaceCreated { surface, shape })?;
                if self.registry.lookup(surface).is_some() {
                    trace!(?surface, "created surface already attached");
                    return Ok(());
                }
                self.attach_surface(node, surface, shape).map(drop)
            }
            other => self.tree.post_notification(node, other),
        }
    }

    /// Turns a client's configure request into move and resize requests.
    fn forward_configure(&mut self, node: NodeId, request: ConfigureRequest) -> Result<(), SceneError> {
        let shape = self.tree.shape(node).ok_or(SceneError::Destroyed(node))?;
        if request.moves() {
            // The display speaks placements; the tree stores positions
            // relative to the parent node.
            let placement = self.tree.placement(node).unwrap_or(shape.position());
            let x = request
                .x
                .map_or(shape.x, |x| shape.x.saturating_add(x.saturating_sub(placement.x)));
            let y = request
                .y
                .map_or(shape.y, |y| shape.y.saturating_add(y.saturating_sub(placement.y)));
            self.tree.request_move(node, x, y)?;
        }
        if request.resizes() {
            self.tree.request_resize(
                node,
                request.width.unwrap_or(shape.width),
                request.height.unwrap_or(shape.height),
            )?;
        }
        Ok(())
    }

    /// Dispatches pending node events, evaluates the tree and applies the
    /// changes to the display.
    pub fn flush(&mut self) -> &SceneChanges {
        let delivered = self.bus.dispatch(&mut self.tree);
        self.tree.evaluate_into(&mut self.changes);
        executor::sync(&mut self.tree, &mut *self.backend, &self.changes);
        for removed in &self.changes.removed {
            if let Some(surface) = removed.surface {
                self.registry.unregister(surface, removed.id);
            }
        }
        if delivered > 0 || !self.changes.is_empty() {
            debug!(
                delivered,
                reshaped = self.changes.reshaped.len(),
                shown = self.changes.shown.len(),
                hidden = self.changes.hidden.len(),
                removed = self.changes.removed.len(),
                "shell flushed"
            );
        }
        &self.changes
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use canopy_core::event::EventKind;
    use canopy_core::geometry::Point;
    use canopy_core::policy::apply_requests;

    use super::*;
    use crate::headless::{BackendCall, HeadlessBackend};

    const ROOT: SurfaceHandle = SurfaceHandle(0x100);
    const CLIENT: SurfaceHandle = SurfaceHandle(0x200);

    fn shell() -> (Shell, HeadlessBackend, NodeId) {
        let backend = HeadlessBackend::new();
        let mut shell = Shell::new(
            &ShellConfig::default(),
            Some(ROOT),
            Rect::new(0, 0, 800, 600),
            backend.clone(),
        );
        shell.subscribe(None, apply_requests);
        let root = shell.tree().root();
        let client = shell
            .attach_surface(root, CLIENT, Rect::new(100, 100, 50, 50))
            .unwrap();
        shell.tree_mut().request_show(root).unwrap();
        shell.tree_mut().request_show(client).unwrap();
        shell.flush();
        backend.take_calls();
        (shell, backend, client)
    }

    #[test]
    fn root_and_attached_surfaces_are_registered() {
        let (shell, _, client) = shell();
        assert_eq!(shell.registry().lookup(ROOT), Some(shell.tree().root()));
        assert_eq!(shell.registry().lookup(CLIENT), Some(client));
    }

    #[test]
    fn requests_reach_the_backend_on_flush() {
        let (mut shell, backend, client) = shell();
        shell.tree_mut().request_move(client, 120, 130).unwrap();
        assert!(backend.calls().is_empty());
        shell.flush();
        assert_eq!(
            backend.calls(),
            [BackendCall::Place(CLIENT, Point::new(120, 130))]
        );
    }

    #[test]
    fn geometry_notification_is_adopted_silently() {
        let (mut shell, backend, client) = shell();
        shell
            .deliver(client, Notification::Geometry(Rect::new(5, 6, 70, 80)))
            .unwrap();
        shell.flush();
        assert!(backend.calls().is_empty());
        assert_eq!(shell.tree().shape(client), Some(Rect::new(5, 6, 70, 80)));
    }

    #[test]
    fn destroy_notification_unregisters_without_native_destroy() {
        let (mut shell, backend, client) = shell();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        shell.subscribe(Some(client), move |_, event| {
            log.lock().unwrap().push(event.kind.clone());
        });

        shell.deliver(client, Notification::Destroy).unwrap();
        let removed = shell.flush().removed.len();
        assert_eq!(removed, 1);
        assert!(backend.calls().is_empty());
        assert_eq!(shell.registry().lookup(CLIENT), None);
        assert_eq!(
            *seen.lock().unwrap(),
            [
                EventKind::Notify(Notification::Destroy),
                EventKind::Destroyed
            ]
        );
        assert_eq!(
            shell.deliver(client, Notification::FocusGained),
            Err(SceneError::Destroyed(client))
        );
    }

    #[test]
    fn teardown_destroys_native_surface() {
        let (mut shell, backend, client) = shell();
        shell
            .tree_mut()
            .destroy(client, DestroyOrigin::Teardown)
            .unwrap();
        shell.flush();
        assert_eq!(backend.calls(), [BackendCall::Destroy(CLIENT)]);
        assert!(shell.registry().lookup(CLIENT).is_none());
    }

    #[test]
    fn destroy_notification_for_the_root_is_refused_before_listeners_see_it() {
        let (mut shell, _, _) = shell();
        let root = shell.tree().root();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        shell.subscribe(Some(root), move |_, event| {
            log.lock().unwrap().push(event.kind.clone());
        });

        assert_eq!(
            shell.deliver(root, Notification::Destroy),
            Err(SceneError::RootDestroy)
        );
        shell.flush();
        assert!(seen.lock().unwrap().is_empty());
        assert!(shell.tree().is_alive(root));
        assert_eq!(shell.registry().lookup(ROOT), Some(root));
    }

    #[test]
    fn configure_request_goes_through_the_request_policy() {
        let (mut shell, backend, client) = shell();
        let request = ConfigureRequest {
            x: Some(30),
            width: Some(80),
            ..ConfigureRequest::default()
        };
        shell
            .deliver(client, Notification::ConfigureRequest(request))
            .unwrap();
        shell.flush();
        assert_eq!(
            backend.calls(),
            [
                BackendCall::Place(CLIENT, Point::new(30, 100)),
                BackendCall::Resize(CLIENT, 80, 50),
            ]
        );
        assert_eq!(shell.tree().shape(client), Some(Rect::new(30, 100, 80, 50)));
    }

    #[test]
    fn vetoed_configure_request_leaves_the_surface_alone() {
        let backend = HeadlessBackend::new();
        let mut shell = Shell::new(
            &ShellConfig::default(),
            Some(ROOT),
            Rect::new(0, 0, 800, 600),
            backend.clone(),
        );
        let root = shell.tree().root();
        let client = shell
            .attach_surface(root, CLIENT, Rect::new(10, 10, 50, 50))
            .unwrap();
        shell.flush();
        backend.take_calls();

        // No request policy subscribed: requests are posted but never applied.
        let request = ConfigureRequest {
            y: Some(300),
            ..ConfigureRequest::default()
        };
        shell
            .deliver(client, Notification::ConfigureRequest(request))
            .unwrap();
        shell.flush();
        assert!(backend.calls().is_empty());
        assert_eq!(shell.tree().shape(client), Some(Rect::new(10, 10, 50, 50)));
    }

    #[test]
    fn created_surface_is_attached_and_mapped_on_request() {
        let (mut shell, backend, _) = shell();
        let root = shell.tree().root();
        let created = SurfaceHandle(0x300);
        let shape = Rect::new(5, 5, 20, 20);

        shell
            .deliver(root, Notification::SurfaceCreated { surface: created, shape })
            .unwrap();
        let node = shell.registry().lookup(created).unwrap();
        assert_eq!(shell.tree().parent(node), Some(root));
        assert_eq!(shell.tree().visible(node), Some(false));

        // A second report of the same surface does not attach it twice.
        shell
            .deliver(root, Notification::SurfaceCreated { surface: created, shape })
            .unwrap();
        assert_eq!(shell.registry().lookup(created), Some(node));

        shell.deliver(node, Notification::MapRequest).unwrap();
        shell.flush();
        assert_eq!(backend.calls(), [BackendCall::Show(created)]);
    }
}
