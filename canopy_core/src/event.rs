// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node events and the listener bus.
//!
//! Every node owns an event channel. Requests (`request_move`, ...) and
//! display notifications are queued on the tree; [`EventBus::dispatch`]
//! delivers them in FIFO order to the listeners subscribed for the target
//! node and to the listeners subscribed for every node.
//!
//! Listeners receive `&mut ShellTree` and may mutate it or post further
//! events, which are delivered in the same dispatch. Subscriptions are
//! explicit: [`EventBus::subscribe`] returns a [`Subscription`] token and
//! the listener lives until [`EventBus::unsubscribe`] or, for a node-bound
//! listener, until its node's [`EventKind::Destroyed`] event is delivered.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use tracing::{trace, warn};

use crate::geometry::{Point, Rect};
use crate::scene::{NodeId, ShellTree, SurfaceHandle};

/// A change asked of a node. Applying it is up to the listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    /// Move to a position relative to the parent.
    Move(Point),
    /// Resize.
    Resize {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
    /// Raise within the stacking context.
    Raise,
    /// Lower within the stacking context.
    Lower,
    /// Set the visible flag.
    Show,
    /// Clear the visible flag.
    Hide,
    /// Move under another parent.
    Reparent(NodeId),
}

/// A typed notification converted from a native display event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The surface's geometry changed on the display.
    Geometry(Rect),
    /// The surface was destroyed on the display.
    Destroy,
    /// The surface gained input focus.
    FocusGained,
    /// The surface lost input focus.
    FocusLost,
    /// A protocol-level message, identified by name.
    Protocol(String),
    /// The surface was mapped on the display.
    Mapped,
    /// The surface was unmapped on the display.
    Unmapped,
    /// A client asked for the surface to be mapped. Only seen by a shell
    /// that redirects the display's structure requests.
    MapRequest,
    /// A client asked for new geometry. Only seen by a shell that redirects
    /// the display's structure requests.
    ConfigureRequest(ConfigureRequest),
    /// A new surface appeared as a child of this node's surface.
    SurfaceCreated {
        /// The new surface.
        surface: SurfaceHandle,
        /// Its geometry, in display coordinates of the parent surface.
        shape: Rect,
    },
}

/// Geometry a client asked for. Fields the client left out are `None`.
///
/// Positions are relative to the surface's native parent, sizes are outer
/// sizes as in [`Rect`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigureRequest {
    /// Requested x.
    pub x: Option<i32>,
    /// Requested y.
    pub y: Option<i32>,
    /// Requested width.
    pub width: Option<u32>,
    /// Requested height.
    pub height: Option<u32>,
}

impl ConfigureRequest {
    /// Returns `true` if the request moves the surface.
    #[must_use]
    pub fn moves(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }

    /// Returns `true` if the request resizes the surface.
    #[must_use]
    pub fn resizes(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// What happened to a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// A request posted through the tree's request API.
    Request(Request),
    /// A notification delivered from the display.
    Notify(Notification),
    /// The node was destroyed. This is the last event a node receives.
    Destroyed,
}

/// An event addressed to one node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeEvent {
    /// The target node. May already be stale for queued events.
    pub node: NodeId,
    /// What happened.
    pub kind: EventKind,
}

/// A listener callback.
pub type Listener = Box<dyn FnMut(&mut ShellTree, &NodeEvent) + Send>;

/// Token identifying a listener registered on an [`EventBus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Entry {
    token: Subscription,
    target: Option<NodeId>,
    listener: Listener,
}

/// Registry of listeners and the dispatcher for a tree's event queue.
pub struct EventBus {
    entries: Vec<Entry>,
    next_token: u64,
    max_deliveries: usize,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.entries.len())
            .field("next_token", &self.next_token)
            .field("max_deliveries", &self.max_deliveries)
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// Default cap on deliveries per [`dispatch`](Self::dispatch).
    pub const DEFAULT_MAX_DELIVERIES: usize = 4096;

    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_deliveries(Self::DEFAULT_MAX_DELIVERIES)
    }

    /// Creates an empty bus that delivers at most `max` events per
    /// dispatch. Listeners that keep re-posting events are cut off there.
    ///
    /// A `max` of zero is promoted to one.
    #[must_use]
    pub fn with_max_deliveries(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            next_token: 0,
            max_deliveries: max.max(1),
        }
    }

    /// Registers a listener for `target`, or for every node if `None`.
    pub fn subscribe<F>(&mut self, target: Option<NodeId>, listener: F) -> Subscription
    where
        F: FnMut(&mut ShellTree, &NodeEvent) + Send + 'static,
    {
        let token = Subscription(self.next_token);
        self.next_token += 1;
        self.entries.push(Entry {
            token,
            target,
            listener: Box::new(listener),
        });
        trace!(?token, ?target, "listener subscribed");
        token
    }

    /// Removes a listener. Returns `false` if the token is unknown or was
    /// already released.
    pub fn unsubscribe(&mut self, token: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.token != token);
        self.entries.len() != before
    }

    /// Returns the number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers queued events until the tree's queue is empty.
    ///
    /// Listeners run in subscription order. Returns the number of events
    /// delivered. If the delivery cap is hit, the rest of the queue is
    /// discarded with a warning.
    pub fn dispatch(&mut self, tree: &mut ShellTree) -> usize {
        let mut delivered = 0;
        while let Some(event) = tree.pop_event() {
            if delivered == self.max_deliveries {
                let dropped = tree.discard_events() + 1;
                warn!(
                    delivered,
                    dropped, "event dispatch cap reached; discarding queued events"
                );
                break;
            }
            delivered += 1;
            for entry in &mut self.entries {
                if entry.target.is_none_or(|t| t == event.node) {
                    (entry.listener)(tree, &event);
                }
            }
            if event.kind == EventKind::Destroyed {
                let node = event.node;
                self.entries.retain(|e| e.target != Some(node));
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::policy::DestroyOrigin;
    use crate::scene::NodeKind;

    fn tree_with_child() -> (ShellTree, NodeId) {
        let mut tree = ShellTree::new(None, Rect::new(0, 0, 100, 100));
        let root = tree.root();
        let a = tree
            .create_node(root, NodeKind::Widget, None, Rect::ZERO)
            .unwrap();
        (tree, a)
    }

    #[test]
    fn delivers_in_fifo_order() {
        let (mut tree, a) = tree_with_child();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let log = Arc::clone(&seen);
        bus.subscribe(Some(a), move |_, event| {
            log.lock().unwrap().push(event.kind.clone());
        });

        tree.request_move(a, 1, 1).unwrap();
        tree.post_notification(a, Notification::FocusGained).unwrap();
        tree.request_hide(a).unwrap();
        assert_eq!(bus.dispatch(&mut tree), 3);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::Request(Request::Move(Point::new(1, 1))),
                EventKind::Notify(Notification::FocusGained),
                EventKind::Request(Request::Hide),
            ]
        );
    }

    #[test]
    fn node_listener_ignores_other_nodes() {
        let (mut tree, a) = tree_with_child();
        let root = tree.root();
        let hits = Arc::new(AtomicUsize::new(0));
        let all_hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let h = Arc::clone(&hits);
        bus.subscribe(Some(a), move |_, _| {
            h.fetch_add(1, Ordering::Relaxed);
        });
        let h = Arc::clone(&all_hits);
        bus.subscribe(None, move |_, _| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        tree.request_show(root).unwrap();
        tree.request_show(a).unwrap();
        bus.dispatch(&mut tree);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(all_hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let (mut tree, a) = tree_with_child();
        let hits = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let h = Arc::clone(&hits);
        let token = bus.subscribe(Some(a), move |_, _| {
            h.fetch_add(1, Ordering::Relaxed);
        });
        assert!(bus.unsubscribe(token));
        assert!(!bus.unsubscribe(token));

        tree.request_show(a).unwrap();
        bus.dispatch(&mut tree);
        assert_eq!(hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn listeners_may_post_follow_up_events() {
        let (mut tree, a) = tree_with_child();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        bus.subscribe(Some(a), |tree, event| {
            if event.kind == EventKind::Request(Request::Show) {
                tree.request_raise(event.node).unwrap();
            }
        });
        let log = Arc::clone(&seen);
        bus.subscribe(Some(a), move |_, event| {
            log.lock().unwrap().push(event.kind.clone());
        });

        tree.request_show(a).unwrap();
        assert_eq!(bus.dispatch(&mut tree), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                EventKind::Request(Request::Show),
                EventKind::Request(Request::Raise),
            ]
        );
    }

    #[test]
    fn destroyed_node_releases_its_listeners() {
        let (mut tree, a) = tree_with_child();
        let last = Arc::new(Mutex::new(None));
        let mut bus = EventBus::new();
        let l = Arc::clone(&last);
        bus.subscribe(Some(a), move |_, event| {
            *l.lock().unwrap() = Some(event.kind.clone());
        });
        bus.subscribe(None, |_, _| {});
        assert_eq!(bus.len(), 2);

        tree.destroy(a, DestroyOrigin::Teardown).unwrap();
        bus.dispatch(&mut tree);
        assert_eq!(*last.lock().unwrap(), Some(EventKind::Destroyed));
        assert_eq!(bus.len(), 1, "only the catch-all listener remains");
    }

    #[test]
    fn runaway_listener_is_cut_off() {
        let (mut tree, a) = tree_with_child();
        let mut bus = EventBus::with_max_deliveries(10);
        bus.subscribe(Some(a), |tree, event| {
            tree.request_raise(event.node).unwrap();
        });

        tree.request_raise(a).unwrap();
        assert_eq!(bus.dispatch(&mut tree), 10);
        assert_eq!(tree.pending_event_count(), 0);
    }
}
