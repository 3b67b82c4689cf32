// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! An in-memory display for tests and demos.
//!
//! [`HeadlessBackend`] records every display call instead of making it, and
//! [`channel_source`] feeds the event pump from a channel.

use std::collections::HashSet;
use std::io;
use std::sync::{Arc, mpsc};

use canopy_core::backend::DisplayBackend;
use canopy_core::error::BackendError;
use canopy_core::geometry::Point;
use canopy_core::scene::SurfaceHandle;
use parking_lot::Mutex;
use tracing::debug;

use crate::{DisplayEventSource, DisplayNotification, EventConverter};

/// A display call recorded by [`HeadlessBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    /// `place(surface, position)`
    Place(SurfaceHandle, Point),
    /// `resize(surface, width, height)`
    Resize(SurfaceHandle, u32, u32),
    /// `show(surface)`
    Show(SurfaceHandle),
    /// `hide(surface)`
    Hide(SurfaceHandle),
    /// `raise(surface)`
    Raise(SurfaceHandle),
    /// `lower(surface)`
    Lower(SurfaceHandle),
    /// `reparent(surface, parent, position)`
    Reparent(SurfaceHandle, Option<SurfaceHandle>, Point),
    /// `destroy(surface)`
    Destroy(SurfaceHandle),
}

impl BackendCall {
    /// Returns the surface the call targeted.
    #[must_use]
    pub fn surface(&self) -> SurfaceHandle {
        match *self {
            Self::Place(s, _)
            | Self::Resize(s, ..)
            | Self::Show(s)
            | Self::Hide(s)
            | Self::Raise(s)
            | Self::Lower(s)
            | Self::Reparent(s, ..)
            | Self::Destroy(s) => s,
        }
    }
}

/// A display backend that records calls.
///
/// Clones share the same log, so a test can keep one clone while the shell
/// owns another.
#[derive(Clone, Debug, Default)]
pub struct HeadlessBackend {
    calls: Arc<Mutex<Vec<BackendCall>>>,
    failing: Arc<Mutex<HashSet<SurfaceHandle>>>,
}

impl HeadlessBackend {
    /// Creates a backend with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the calls recorded so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Returns and clears the calls recorded so far.
    pub fn take_calls(&self) -> Vec<BackendCall> {
        core::mem::take(&mut *self.calls.lock())
    }

    /// Makes every later call on `surface` fail.
    pub fn fail_surface(&self, surface: SurfaceHandle) {
        self.failing.lock().insert(surface);
    }

    fn record(
        &self,
        surface: SurfaceHandle,
        op: &'static str,
        call: BackendCall,
    ) -> Result<(), BackendError> {
        if self.failing.lock().contains(&surface) {
            return Err(BackendError {
                surface,
                op,
                reason: String::from("surface marked failing"),
            });
        }
        debug!(?call, "headless display call");
        self.calls.lock().push(call);
        Ok(())
    }
}

impl DisplayBackend for HeadlessBackend {
    fn place(&mut self, surface: SurfaceHandle, position: Point) -> Result<(), BackendError> {
        self.record(surface, "place", BackendCall::Place(surface, position))
    }

    fn resize(&mut self, surface: SurfaceHandle, width: u32, height: u32) -> Result<(), BackendError> {
        self.record(surface, "resize", BackendCall::Resize(surface, width, height))
    }

    fn show(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.record(surface, "show", BackendCall::Show(surface))
    }

    fn hide(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.record(surface, "hide", BackendCall::Hide(surface))
    }

    fn raise(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.record(surface, "raise", BackendCall::Raise(surface))
    }

    fn lower(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.record(surface, "lower", BackendCall::Lower(surface))
    }

    fn reparent(
        &mut self,
        surface: SurfaceHandle,
        parent: Option<SurfaceHandle>,
        position: Point,
    ) -> Result<(), BackendError> {
        self.record(
            surface,
            "reparent",
            BackendCall::Reparent(surface, parent, position),
        )
    }

    fn destroy(&mut self, surface: SurfaceHandle) -> Result<(), BackendError> {
        self.record(surface, "destroy", BackendCall::Destroy(surface))
    }
}

/// An event source fed through a channel. The source closes once every
/// sender is dropped.
pub struct ChannelSource<E> {
    receiver: mpsc::Receiver<E>,
}

impl<E> core::fmt::Debug for ChannelSource<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChannelSource").finish_non_exhaustive()
    }
}

/// Creates a channel-backed event source and its sending half.
#[must_use]
pub fn channel_source<E>() -> (mpsc::Sender<E>, ChannelSource<E>) {
    let (sender, receiver) = mpsc::channel();
    (sender, ChannelSource { receiver })
}

impl<E: Send + 'static> DisplayEventSource for ChannelSource<E> {
    type Event = E;

    fn next_event(&mut self) -> io::Result<Option<E>> {
        Ok(self.receiver.recv().ok())
    }
}

/// Converter for sources that already produce [`DisplayNotification`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl EventConverter for Passthrough {
    type Event = DisplayNotification;

    fn convert(&self, event: &DisplayNotification) -> Option<DisplayNotification> {
        Some(event.clone())
    }
}
