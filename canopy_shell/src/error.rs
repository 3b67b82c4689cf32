// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_core::error::SceneError;
use canopy_core::scene::NodeId;

/// Errors surfaced by the shell and its requests.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The shell thread is gone or shutting down; the task never ran.
    #[error("the shell executor rejected the task")]
    Rejected,
    /// The target node was destroyed before the request took effect.
    #[error("target node {0:?} was destroyed")]
    TargetDestroyed(NodeId),
    /// The scene tree refused the operation.
    #[error(transparent)]
    Scene(SceneError),
    /// The configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    /// An I/O error from the display source or the filesystem.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A shell thread panicked.
    #[error("a shell thread panicked")]
    Panicked,
}

impl From<SceneError> for ShellError {
    fn from(err: SceneError) -> Self {
        match err {
            SceneError::Destroyed(id) => Self::TargetDestroyed(id),
            other => Self::Scene(other),
        }
    }
}
