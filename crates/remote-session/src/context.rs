// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Endpoints and execution contexts.

use artifact_builder::DeviceKind;
use std::fmt;

/// Where a session connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Routing key. When set, `host:port` is a routing proxy that forwards
    /// the session to the peer registered under this key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, key: Option<String>) -> Self {
        Self {
            host: host.into(),
            port,
            key,
        }
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}:{} (key '{key}')", self.host, self.port),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// An execution context on the peer: a device kind and an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ContextId {
    pub device: DeviceKind,
    pub index: u32,
}

impl ContextId {
    pub fn new(device: DeviceKind, index: u32) -> Self {
        Self { device, index }
    }

    pub fn cpu() -> Self {
        Self::new(DeviceKind::Cpu, 0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.device, self.index)
    }
}
