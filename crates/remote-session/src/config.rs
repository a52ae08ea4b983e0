// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Session configuration.

use std::time::Duration;

/// Client-side session settings.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SessionConfig {
    /// Bound on connect and on every blocking read/write, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Name announced to the peer in the hello frame.
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_client_name() -> String {
    format!("offload-rt/{}", env!("CARGO_PKG_VERSION"))
}

impl SessionConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout_ms: timeout.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            client_name: default_client_name(),
        }
    }
}
