// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Server event to notification conversion.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use canopy_core::event::{ConfigureRequest, Notification};
use canopy_core::scene::SurfaceHandle;
use canopy_shell::{DisplayNotification, EventConverter};
use parking_lot::Mutex;
use tracing::trace;
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{
    Atom, ConfigWindow, ConfigureRequestEvent, ConnectionExt as _, CreateNotifyEvent, Window,
};
use x11rb::rust_connection::RustConnection;

use crate::borders::{Borders, outer_rect};
use crate::display::client_events;

/// Converts X server events into shell notifications.
///
/// Property and client-message notifications carry the atom's name. Names
/// are fetched from the server once and cached; without a connection, or if
/// the lookup fails, the atom is rendered as `atom:<id>`.
///
/// Sizes are reported as outer sizes. The border width the server reports
/// for each window is remembered for the backend's resizes.
///
/// Redirected `MapRequest` and `ConfigureRequest` events, and
/// `CreateNotify` for windows without override-redirect, are forwarded so
/// a managing shell can adopt new windows and decide what clients ask for.
pub struct X11EventConverter {
    conn: Option<Arc<RustConnection>>,
    atom_names: Mutex<HashMap<Atom, String>>,
    borders: Borders,
}

impl fmt::Debug for X11EventConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("X11EventConverter")
            .field("connected", &self.conn.is_some())
            .field("cached_atoms", &self.atom_names.lock().len())
            .finish()
    }
}

impl Default for X11EventConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl X11EventConverter {
    /// Creates a converter that never talks to the server.
    #[must_use]
    pub fn new() -> Self {
        Self {
            conn: None,
            atom_names: Mutex::new(HashMap::new()),
            borders: Borders::default(),
        }
    }

    /// Creates a converter that resolves atom names over `conn`.
    #[must_use]
    pub fn with_connection(conn: Arc<RustConnection>) -> Self {
        Self {
            conn: Some(conn),
            ..Self::new()
        }
    }

    /// Shares the border cache with a backend.
    pub(crate) fn sharing_borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    /// Seeds the name cache.
    #[must_use]
    pub fn with_atom_name(self, atom: Atom, name: impl Into<String>) -> Self {
        self.atom_names.lock().insert(atom, name.into());
        self
    }

    fn atom_name(&self, atom: Atom) -> String {
        if let Some(name) = self.atom_names.lock().get(&atom) {
            return name.clone();
        }
        let Some(conn) = &self.conn else {
            return format!("atom:{atom}");
        };
        match fetch_atom_name(conn, atom) {
            Ok(name) => {
                self.atom_names.lock().insert(atom, name.clone());
                name
            }
            Err(err) => {
                trace!(atom, %err, "atom name lookup failed");
                format!("atom:{atom}")
            }
        }
    }

    fn configure_request(&self, event: &ConfigureRequestEvent) -> ConfigureRequest {
        let mask = event.value_mask;
        let border = if mask.contains(ConfigWindow::BORDER_WIDTH) {
            event.border_width
        } else {
            self.borders.get(event.window)
        };
        let outer = |size: u16| u32::from(size) + 2 * u32::from(border);
        ConfigureRequest {
            x: mask.contains(ConfigWindow::X).then_some(i32::from(event.x)),
            y: mask.contains(ConfigWindow::Y).then_some(i32::from(event.y)),
            width: mask.contains(ConfigWindow::WIDTH).then_some(outer(event.width)),
            height: mask.contains(ConfigWindow::HEIGHT).then_some(outer(event.height)),
        }
    }

    fn created(&self, event: &CreateNotifyEvent) -> Option<(Window, Notification)> {
        if event.override_redirect {
            trace!(window = event.window, "override-redirect window ignored");
            return None;
        }
        self.borders.record(event.window, event.border_width);
        self.select_client_events(event.window);
        let notification = Notification::SurfaceCreated {
            surface: SurfaceHandle(event.window),
            shape: outer_rect(event.x, event.y, event.width, event.height, event.border_width),
        };
        Some((event.parent, notification))
    }

    /// Asks for the new window's own structure, focus and property events.
    fn select_client_events(&self, window: Window) {
        let Some(conn) = &self.conn else {
            return;
        };
        let sent = conn
            .change_window_attributes(window, &client_events())
            .and_then(|_| conn.flush());
        if let Err(err) = sent {
            trace!(window, %err, "cannot watch created window");
        }
    }
}

fn fetch_atom_name(conn: &RustConnection, atom: Atom) -> Result<String, ReplyError> {
    let reply = conn.get_atom_name(atom)?.reply()?;
    Ok(String::from_utf8_lossy(&reply.name).into_owned())
}

impl EventConverter for X11EventConverter {
    type Event = Event;

    fn convert(&self, event: &Event) -> Option<DisplayNotification> {
        let (window, notification) = match event {
            Event::ConfigureNotify(e) => {
                self.borders.record(e.window, e.border_width);
                let shape = outer_rect(e.x, e.y, e.width, e.height, e.border_width);
                (e.window, Notification::Geometry(shape))
            }
            Event::DestroyNotify(e) => {
                self.borders.forget(e.window);
                (e.window, Notification::Destroy)
            }
            Event::MapNotify(e) => (e.window, Notification::Mapped),
            Event::UnmapNotify(e) => (e.window, Notification::Unmapped),
            Event::MapRequest(e) => (e.window, Notification::MapRequest),
            Event::ConfigureRequest(e) => {
                (e.window, Notification::ConfigureRequest(self.configure_request(e)))
            }
            Event::CreateNotify(e) => self.created(e)?,
            Event::FocusIn(e) => (e.event, Notification::FocusGained),
            Event::FocusOut(e) => (e.event, Notification::FocusLost),
            Event::PropertyNotify(e) => (e.window, Notification::Protocol(self.atom_name(e.atom))),
            Event::ClientMessage(e) => (e.window, Notification::Protocol(self.atom_name(e.type_))),
            _ => {
                trace!("backend-internal event filtered");
                return None;
            }
        };
        Some(DisplayNotification::new(SurfaceHandle(window), notification))
    }
}

#[cfg(test)]
mod tests {
    use canopy_core::geometry::Rect;
    use x11rb::protocol::xproto::{
        CONFIGURE_NOTIFY_EVENT, CONFIGURE_REQUEST_EVENT, CREATE_NOTIFY_EVENT,
        ClientMessageEvent, ConfigureNotifyEvent, DESTROY_NOTIFY_EVENT, DestroyNotifyEvent,
        EXPOSE_EVENT, ExposeEvent, FOCUS_IN_EVENT, FOCUS_OUT_EVENT, FocusInEvent,
        MAP_NOTIFY_EVENT, MAP_REQUEST_EVENT, MapNotifyEvent, MapRequestEvent, NotifyDetail,
        NotifyMode, PROPERTY_NOTIFY_EVENT, Property, PropertyNotifyEvent, StackMode,
        UNMAP_NOTIFY_EVENT, UnmapNotifyEvent,
    };

    use super::*;

    const WINDOW: u32 = 0x0040_0001;
    const PARENT: u32 = 0x0000_01e0;

    fn focus(response_type: u8) -> FocusInEvent {
        FocusInEvent {
            response_type,
            detail: NotifyDetail::NONLINEAR,
            sequence: 7,
            event: WINDOW,
            mode: NotifyMode::NORMAL,
        }
    }

    fn convert(event: Event) -> Option<DisplayNotification> {
        X11EventConverter::new()
            .with_atom_name(42, "WM_NAME")
            .convert(&event)
    }

    #[test]
    fn configure_notify_reports_the_outer_rectangle() {
        let event = Event::ConfigureNotify(ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 1,
            event: PARENT,
            window: WINDOW,
            above_sibling: 0,
            x: -4,
            y: 30,
            width: 640,
            height: 480,
            border_width: 2,
            override_redirect: false,
        });
        assert_eq!(
            convert(event),
            Some(DisplayNotification::new(
                SurfaceHandle(WINDOW),
                Notification::Geometry(Rect::new(-4, 30, 644, 484)),
            ))
        );
    }

    #[test]
    fn destroy_targets_the_destroyed_window_not_the_listener() {
        let event = Event::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 2,
            event: PARENT,
            window: WINDOW,
        });
        let converted = convert(event).unwrap();
        assert_eq!(converted.surface, SurfaceHandle(WINDOW));
        assert_eq!(converted.notification, Notification::Destroy);
    }

    #[test]
    fn focus_changes_map_to_gained_and_lost() {
        let gained = convert(Event::FocusIn(focus(FOCUS_IN_EVENT))).unwrap();
        let lost = convert(Event::FocusOut(focus(FOCUS_OUT_EVENT))).unwrap();
        assert_eq!(gained.notification, Notification::FocusGained);
        assert_eq!(lost.notification, Notification::FocusLost);
    }

    #[test]
    fn property_and_client_messages_carry_atom_names() {
        let property = Event::PropertyNotify(PropertyNotifyEvent {
            response_type: PROPERTY_NOTIFY_EVENT,
            sequence: 3,
            window: WINDOW,
            atom: 42,
            time: 0,
            state: Property::NEW_VALUE,
        });
        assert_eq!(
            convert(property).unwrap().notification,
            Notification::Protocol("WM_NAME".into())
        );

        let message = ClientMessageEvent::new(32, WINDOW, 77_u32, [0_u32; 5]);
        assert_eq!(
            convert(Event::ClientMessage(message)).unwrap().notification,
            Notification::Protocol("atom:77".into())
        );
    }

    fn configure_notify(width: u16, height: u16, border_width: u16) -> Event {
        Event::ConfigureNotify(ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 1,
            event: PARENT,
            window: WINDOW,
            above_sibling: 0,
            x: 0,
            y: 0,
            width,
            height,
            border_width,
            override_redirect: false,
        })
    }

    fn create_notify(override_redirect: bool) -> Event {
        Event::CreateNotify(CreateNotifyEvent {
            response_type: CREATE_NOTIFY_EVENT,
            sequence: 5,
            parent: PARENT,
            window: WINDOW,
            x: 12,
            y: 24,
            width: 200,
            height: 100,
            border_width: 1,
            override_redirect,
        })
    }

    fn configure_request(value_mask: ConfigWindow, border_width: u16) -> Event {
        Event::ConfigureRequest(ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 6,
            parent: PARENT,
            window: WINDOW,
            sibling: 0,
            x: 40,
            y: 50,
            width: 300,
            height: 200,
            border_width,
            value_mask,
        })
    }

    #[test]
    fn reported_border_is_removed_again_before_resizing() {
        let converter = X11EventConverter::new();
        let geometry = converter.convert(&configure_notify(700, 500, 2)).unwrap();
        let Notification::Geometry(shape) = geometry.notification else {
            panic!("expected geometry, got {:?}", geometry.notification);
        };
        assert_eq!((shape.width, shape.height), (704, 504));
        // The backend resizes to the same outer size without growing.
        assert_eq!(
            converter.borders.inner_size(WINDOW, shape.width, shape.height),
            (700, 500)
        );

        converter.convert(&Event::DestroyNotify(DestroyNotifyEvent {
            response_type: DESTROY_NOTIFY_EVENT,
            sequence: 2,
            event: PARENT,
            window: WINDOW,
        }));
        assert_eq!(converter.borders.get(WINDOW), 0);
    }

    #[test]
    fn map_and_unmap_notifications_are_forwarded() {
        let mapped = Event::MapNotify(MapNotifyEvent {
            response_type: MAP_NOTIFY_EVENT,
            sequence: 4,
            event: PARENT,
            window: WINDOW,
            override_redirect: false,
        });
        let unmapped = Event::UnmapNotify(UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 5,
            event: PARENT,
            window: WINDOW,
            from_configure: false,
        });
        assert_eq!(
            convert(mapped),
            Some(DisplayNotification::new(SurfaceHandle(WINDOW), Notification::Mapped))
        );
        assert_eq!(
            convert(unmapped),
            Some(DisplayNotification::new(SurfaceHandle(WINDOW), Notification::Unmapped))
        );
    }

    #[test]
    fn expose_is_filtered() {
        let event = Event::Expose(ExposeEvent {
            response_type: EXPOSE_EVENT,
            sequence: 4,
            window: WINDOW,
            x: 0,
            y: 0,
            width: 10,
            height: 10,
            count: 0,
        });
        assert_eq!(convert(event), None);
    }

    #[test]
    fn map_request_targets_the_requesting_window() {
        let event = Event::MapRequest(MapRequestEvent {
            response_type: MAP_REQUEST_EVENT,
            sequence: 6,
            parent: PARENT,
            window: WINDOW,
        });
        assert_eq!(
            convert(event),
            Some(DisplayNotification::new(SurfaceHandle(WINDOW), Notification::MapRequest))
        );
    }

    #[test]
    fn configure_request_keeps_only_the_fields_the_client_set() {
        let converter = X11EventConverter::new();
        converter.convert(&configure_notify(10, 10, 3));

        let moved = converter
            .convert(&configure_request(ConfigWindow::X | ConfigWindow::Y, 0))
            .unwrap();
        assert_eq!(
            moved.notification,
            Notification::ConfigureRequest(ConfigureRequest {
                x: Some(40),
                y: Some(50),
                ..ConfigureRequest::default()
            })
        );

        // Sizes become outer sizes using the border the window already has.
        let resized = converter
            .convert(&configure_request(ConfigWindow::WIDTH, 0))
            .unwrap();
        assert_eq!(
            resized.notification,
            Notification::ConfigureRequest(ConfigureRequest {
                width: Some(306),
                ..ConfigureRequest::default()
            })
        );

        // A border in the request itself wins.
        let bordered = converter
            .convert(&configure_request(
                ConfigWindow::HEIGHT | ConfigWindow::BORDER_WIDTH,
                1,
            ))
            .unwrap();
        assert_eq!(
            bordered.notification,
            Notification::ConfigureRequest(ConfigureRequest {
                height: Some(202),
                ..ConfigureRequest::default()
            })
        );
    }

    #[test]
    fn created_windows_are_reported_to_their_parent() {
        let converter = X11EventConverter::new();
        let created = converter.convert(&create_notify(false)).unwrap();
        assert_eq!(created.surface, SurfaceHandle(PARENT));
        assert_eq!(
            created.notification,
            Notification::SurfaceCreated {
                surface: SurfaceHandle(WINDOW),
                shape: Rect::new(12, 24, 202, 102),
            }
        );
        assert_eq!(converter.borders.get(WINDOW), 1);
    }

    #[test]
    fn override_redirect_windows_are_not_adopted() {
        assert_eq!(convert(create_notify(true)), None);
    }
}
