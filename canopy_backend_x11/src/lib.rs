// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! X11 backend for canopy.
//!
//! - [`X11Display`] connects to the server and hands out the other pieces
//! - [`X11Backend`] turns executor output into `ConfigureWindow`, `MapWindow`
//!   and friends
//! - [`X11EventSource`] blocks on the connection for the event pump
//! - [`X11EventConverter`] maps server events to shell notifications
//!
//! Structure notifications (configure, destroy, map, unmap and the creation
//! of top-level windows), focus, property and client messages are
//! forwarded. Connected in [`X11Mode::Manage`], the shell also receives
//! clients' map and configure requests and decides them through its request
//! policy. Expose and the remaining events are filtered out.

mod borders;
mod convert;
mod display;
mod error;

pub use convert::X11EventConverter;
pub use display::{X11Backend, X11Display, X11EventSource, X11Mode};
pub use error::X11Error;
