// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Connection, display backend and event source.

use std::{fmt, io};
use std::sync::Arc;

use canopy_core::backend::DisplayBackend;
use canopy_core::error::BackendError;
use canopy_core::geometry::{Point, Rect};
use canopy_core::scene::SurfaceHandle;
use canopy_shell::DisplayEventSource;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::{ErrorKind, Event};
use x11rb::protocol::xproto::{
    ChangeWindowAttributesAux, ConfigureWindowAux, ConnectionExt as _, EventMask, StackMode,
    Window,
};
use x11rb::rust_connection::RustConnection;

use crate::borders::{Borders, outer_rect};
use crate::{X11Error, X11EventConverter};

/// How the shell relates to the other clients of the display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum X11Mode {
    /// Follow structure changes made by others.
    #[default]
    Observe,
    /// Redirect map and configure requests of the root's children to the
    /// shell, as a window manager does. Only one client per screen can.
    Manage,
}

impl X11Mode {
    fn root_events(self) -> EventMask {
        let observed = EventMask::SUBSTRUCTURE_NOTIFY | EventMask::PROPERTY_CHANGE;
        match self {
            Self::Observe => observed,
            Self::Manage => observed | EventMask::SUBSTRUCTURE_REDIRECT,
        }
    }
}

/// The events the shell consumes for a client window.
pub(crate) fn client_events() -> ChangeWindowAttributesAux {
    ChangeWindowAttributesAux::new().event_mask(
        EventMask::STRUCTURE_NOTIFY | EventMask::FOCUS_CHANGE | EventMask::PROPERTY_CHANGE,
    )
}

/// An open connection to one X screen.
pub struct X11Display {
    conn: Arc<RustConnection>,
    root: Window,
    width: u16,
    height: u16,
    borders: Borders,
}

impl fmt::Debug for X11Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Display")
            .field("root", &self.root)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl X11Display {
    /// Connects to `display_name`, or to `$DISPLAY` if `None`.
    ///
    /// Subscribes to structure and property events of the root's children.
    /// In [`X11Mode::Manage`] their map and configure requests are
    /// redirected too; this fails with [`X11Error::AlreadyManaged`] if
    /// another client holds the redirect.
    pub fn connect(display_name: Option<&str>, mode: X11Mode) -> Result<Self, X11Error> {
        let (conn, screen_num) = x11rb::connect(display_name)?;
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .ok_or(X11Error::NoScreen(screen_num))?;
        let (root, width, height) = (screen.root, screen.width_in_pixels, screen.height_in_pixels);
        info!(screen_num, root, width, height, ?mode, "connected to X server");

        conn.change_window_attributes(
            root,
            &ChangeWindowAttributesAux::new().event_mask(mode.root_events()),
        )?
        .check()
        .map_err(|err| match err {
            ReplyError::X11Error(ref e) if e.error_kind == ErrorKind::Access => {
                X11Error::AlreadyManaged
            }
            other => other.into(),
        })?;
        Ok(Self {
            conn: Arc::new(conn),
            root,
            width,
            height,
            borders: Borders::default(),
        })
    }

    /// Returns the root window's handle.
    #[must_use]
    pub fn root_surface(&self) -> SurfaceHandle {
        SurfaceHandle(self.root)
    }

    /// Returns the root window's geometry.
    #[must_use]
    pub fn root_shape(&self) -> Rect {
        Rect::new(0, 0, u32::from(self.width), u32::from(self.height))
    }

    /// Subscribes to the events the shell consumes for a client window.
    pub fn watch(&self, surface: SurfaceHandle) -> Result<(), X11Error> {
        self.conn
            .change_window_attributes(surface.0, &client_events())?
            .check()?;
        debug!(?surface, "watching window");
        Ok(())
    }

    /// Lists the root's children with their outer geometry, bottom to top.
    ///
    /// Windows destroyed while the list is gathered are skipped.
    pub fn top_level_windows(&self) -> Result<Vec<(SurfaceHandle, Rect)>, X11Error> {
        let tree = self.conn.query_tree(self.root)?.reply()?;
        let mut windows = Vec::with_capacity(tree.children.len());
        for window in tree.children {
            let geometry = match self.conn.get_geometry(window)?.reply() {
                Ok(geometry) => geometry,
                Err(err) => {
                    debug!(window, %err, "window vanished during scan");
                    continue;
                }
            };
            self.borders.record(window, geometry.border_width);
            let shape = outer_rect(
                geometry.x,
                geometry.y,
                geometry.width,
                geometry.height,
                geometry.border_width,
            );
            windows.push((SurfaceHandle(window), shape));
        }
        Ok(windows)
    }

    /// Returns a display backend sharing this connection.
    #[must_use]
    pub fn backend(&self) -> X11Backend {
        X11Backend {
            conn: Arc::clone(&self.conn),
            root: self.root,
            borders: self.borders.clone(),
        }
    }

    /// Returns an event source sharing this connection.
    #[must_use]
    pub fn event_source(&self) -> X11EventSource {
        X11EventSource {
            conn: Arc::clone(&self.conn),
        }
    }

    /// Returns a converter that resolves atom names over this connection.
    ///
    /// The converter records window borders for this display's backends.
    #[must_use]
    pub fn converter(&self) -> X11EventConverter {
        X11EventConverter::with_connection(Arc::clone(&self.conn))
            .sharing_borders(self.borders.clone())
    }
}

/// Applies scene changes to X windows.
///
/// Requests are flushed one by one; protocol errors come back later as
/// events and are not reported here.
#[derive(Clone)]
pub struct X11Backend {
    conn: Arc<RustConnection>,
    root: Window,
    borders: Borders,
}

impl fmt::Debug for X11Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11Backend")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl X11Backend {
    fn finish<T>(
        &self,
        surface: SurfaceHandle,
        op: &'static str,
        sent: Result<T, ConnectionError>,
    ) -> Result<(), BackendError> {
        sent.and_then(|_| self.conn.flush())
            .map_err(|err| BackendError {
                surface,
                op,
                reason: err.to_string(),
            })
    }

    fn configure(
        &self,
        surface: SurfaceHandle,
        op: &'static str,
        aux: &ConfigureWindowAux,
    ) -> Result<(), BackendError> {
        self.finish(surface, op, self.conn.configure_window(surface.0, aux))
    }
}

/// Clamps a coordinate to the protocol's 16-bit range.
fn coord(value: i32) -> i16 {
    i16::try_from(value).unwrap_or(if value < 0 { i16::MIN } else { i16::MAX })
}

impl DisplayBackend for X11Backend {
    fn place(&mut self, surface: SurfaceHandle, position: Point) -> Result<(), BackendError> {
        self.configure(
            surface,
            "place",
            &ConfigureWindowAux::new().x(position.x).y(position.y),
        )
    }

    fn resize(&mut self, surface: SurfaceHandle, width: u32, height: u32) -> Result<(), BackendError> {
        let (width, height) = self.borders.inner_size(surface.0, width, height);
        self.configure(
            surface,
            "resize",
            &ConfigureWindowAux::new().width(width).height(height),
        )
    }

    fn show(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.finish(surface, "show", self.conn.map_window(surface.0))
    }

    fn hide(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.finish(surface, "hide", self.conn.unmap_window(surface.0))
    }

    fn raise(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.configure(
            surface,
            "raise",
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )
    }

    fn lower(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.configure(
            surface,
            "lower",
            &ConfigureWindowAux::new().stack_mode(StackMode::BELOW),
        )
    }

    fn reparent(
        &mut self,
        surface: SurfaceHandle,
        parent: Option<SurfaceHandle>,
        position: Point,
    ) -> Result<(), BackendError> {
        let parent = parent.map_or(self.root, |p| p.0);
        let sent = self
            .conn
            .reparent_window(surface.0, parent, coord(position.x), coord(position.y));
        self.finish(surface, "reparent", sent)
    }

    fn destroy(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.finish(surface, "destroy", self.conn.destroy_window(surface.0))
    }
}

/// Blocking reader of server events.
pub struct X11EventSource {
    conn: Arc<RustConnection>,
}

impl fmt::Debug for X11EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11EventSource").finish_non_exhaustive()
    }
}

impl DisplayEventSource for X11EventSource {
    type Event = Event;

    fn next_event(&mut self) -> io::Result<Option<Event>> {
        self.conn
            .wait_for_event()
            .map(Some)
            .map_err(io::Error::other)
    }
}
