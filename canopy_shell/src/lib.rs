// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Threading and display integration for the canopy scene graph.
//!
//! A [`Shell`] owns one display's [`ShellTree`](canopy_core::scene::ShellTree),
//! its listener bus and its display backend. [`ShellExecutor`] moves the shell
//! onto a dedicated thread; every mutation from then on is a task submitted
//! through a [`ShellHandle`] and answered by a [`Request`] future.
//!
//! Native events enter through an [`EventPump`]:
//!
//! ```text
//!   DisplayEventSource ──► producer thread ──► EventConverter
//!                                                   │
//!                     bounded queue (blocking) ◄────┘
//!                                   │
//!                                   ▼
//!   dispatcher thread ──► SurfaceRegistry lookup ──► ShellHandle::post
//!                                                   │
//!                            shell thread ◄─────────┘
//!                     Shell::deliver ──► Shell::flush
//! ```
//!
//! Events are delivered in the order the display produced them. Events for
//! surfaces the registry does not know are dropped.
//!
//! [`headless`] provides an in-memory backend and event source for tests and
//! demos.

mod config;
mod error;
mod executor;
pub mod headless;
mod pump;
mod registry;
mod shell;

pub use config::ShellConfig;
pub use error::ShellError;
pub use executor::{Request, ShellExecutor, ShellHandle};
pub use pump::{DisplayEventSource, DisplayNotification, EventConverter, EventPump, PumpStats};
pub use registry::SurfaceRegistry;
pub use shell::Shell;
