// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for native display integrations.
//!
//! Canopy splits platform-specific work into *backend* crates. Each backend
//! provides two pieces:
//!
//! - **Display operations**: implements [`DisplayBackend`] so the native
//!   executor can move, resize, map, unmap, restack, reparent and destroy
//!   surfaces.
//!
//! - **Event conversion**: turns native event records into
//!   [`Notification`](crate::event::Notification)s. The conversion trait
//!   lives with the event pump in `canopy_shell`, since it only makes sense
//!   next to a thread that reads the display.
//!
//! # Crate boundaries
//!
//! `canopy_core` owns the data model, evaluation and this contract module.
//! Backend crates depend on `canopy_core` and provide platform glue. The
//! shell crate wires them together on the owning thread:
//!
//! ```rust,ignore
//! fn flush(shell: &mut Shell) {
//!     // Listeners turn requests into mutations.
//!     bus.dispatch(&mut tree);
//!
//!     // Drain dirty channels, compute visibility transitions.
//!     let changes = tree.evaluate();
//!
//!     // Executors translate the changes into backend calls.
//!     executor::sync(&mut tree, &mut backend, &changes);
//! }
//! ```

use crate::error::BackendError;
use crate::geometry::Point;
use crate::scene::SurfaceHandle;

/// Native display operations on a single surface.
///
/// Positions are relative to the surface's native parent. Every call may
/// fail; failures are logged by the caller and never roll back tree state.
pub trait DisplayBackend {
    /// Moves the surface.
    fn place(&mut self, surface: SurfaceHandle, position: Point) -> Result<(), BackendError>;

    /// Resizes the surface.
    fn resize(
        &mut self,
        surface: SurfaceHandle,
        width: u32,
        height: u32,
    ) -> Result<(), BackendError>;

    /// Maps the surface.
    fn show(&mut self, surface: SurfaceHandle) -> Result<(), BackendError>;

    /// Unmaps the surface.
    fn hide(&mut self, surface: SurfaceHandle) -> Result<(), BackendError>;

    /// Raises the surface to the top of its siblings.
    fn raise(&mut self, surface: SurfaceHandle) -> Result<(), BackendError>;

    /// Lowers the surface to the bottom of its siblings.
    fn lower(&mut self, surface: SurfaceHandle) -> Result<(), BackendError>;

    /// Moves the surface under a new native parent at `position`.
    ///
    /// `parent` is `None` when no display-backed ancestor exists, meaning the
    /// display's own root.
    fn reparent(
        &mut self,
        surface: SurfaceHandle,
        parent: Option<SurfaceHandle>,
        position: Point,
    ) -> Result<(), BackendError>;

    /// Destroys the surface.
    fn destroy(&mut self, surface: SurfaceHandle) -> Result<(), BackendError>;
}
