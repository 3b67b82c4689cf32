// Copyright 2026 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shell configuration, loaded from TOML.

use std::fs;
use std::path::Path;

use canopy_core::policy::DestroyPolicy;
use serde::{Deserialize, Serialize};

use crate::ShellError;

/// Runtime configuration of a shell.
///
/// Every field has a default, so an empty file is a valid configuration:
///
/// ```toml
/// event_queue_capacity = 1024
/// destroy_policy = "cascade"        # or "reparent_to_root"
/// max_deliveries_per_flush = 4096
/// thread_name = "canopy-shell"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Capacity of the queue between the event producer and dispatcher.
    /// The producer blocks while it is full.
    pub event_queue_capacity: usize,
    /// What happens to the children of a destroyed node.
    pub destroy_policy: DestroyPolicy,
    /// Cap on node events delivered per flush.
    pub max_deliveries_per_flush: usize,
    /// Name of the owning shell thread.
    pub thread_name: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 1024,
            destroy_policy: DestroyPolicy::Cascade,
            max_deliveries_per_flush: 4096,
            thread_name: String::from("canopy-shell"),
        }
    }
}

impl ShellConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ShellError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ShellError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
