// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use x11rb::errors::{ConnectError, ConnectionError, ReplyError};

/// Errors from setting up the X11 connection.
#[derive(Debug, thiserror::Error)]
pub enum X11Error {
    /// Connecting to the server failed.
    #[error("cannot connect to the X server: {0}")]
    Connect(#[from] ConnectError),
    /// The connection broke while sending a request.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    /// The server answered a request with an error.
    #[error(transparent)]
    Reply(#[from] ReplyError),
    /// Another client already redirects the root window's structure
    /// requests.
    #[error("another window manager is running")]
    AlreadyManaged,
    /// The server has no screen with the preferred index.
    #[error("the X server has no screen {0}")]
    NoScreen(usize),
}
