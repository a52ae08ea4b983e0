// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Peer and proxy configuration loaded from TOML.
//!
//! # TOML Format
//! ```toml
//! name = "rpi4-a"
//! listen = "0.0.0.0:9190"
//! key = "rpi4"
//! sandbox = "/var/lib/offload-peer"
//! devices = ["cpu:1", "opencl:2"]
//! ```

use crate::PeerError;
use artifact_builder::DeviceKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Configuration for a peer server.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PeerConfig {
    /// Name announced in the welcome frame.
    #[serde(default = "default_name")]
    pub name: String,
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: String,
    /// When set, clients must present this key in their hello.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Directory under which every uploaded file is staged.
    #[serde(default = "default_sandbox")]
    pub sandbox: PathBuf,
    /// Device inventory as `kind:count` entries.
    #[serde(default = "default_devices")]
    pub devices: Vec<String>,
}

fn default_name() -> String {
    "offload-peer".to_string()
}

fn default_listen() -> String {
    "0.0.0.0:9190".to_string()
}

fn default_sandbox() -> PathBuf {
    std::env::temp_dir().join("offload-peer")
}

fn default_devices() -> Vec<String> {
    vec!["cpu:1".to_string()]
}

impl PeerConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PeerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PeerError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PeerError> {
        toml::from_str(toml_str).map_err(|e| PeerError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PeerError> {
        toml::to_string_pretty(self)
            .map_err(|e| PeerError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the device inventory. `"cpu"` alone means one device.
    pub fn device_inventory(&self) -> Result<Vec<(DeviceKind, u32)>, PeerError> {
        let mut out: Vec<(DeviceKind, u32)> = Vec::new();
        for entry in &self.devices {
            let (kind, count) = match entry.split_once(':') {
                Some((k, c)) => (
                    k,
                    c.trim()
                        .parse::<u32>()
                        .map_err(|_| PeerError::Config(format!("bad device count in '{entry}'")))?,
                ),
                None => (entry.as_str(), 1),
            };
            let kind = DeviceKind::parse(kind.trim())
                .ok_or_else(|| PeerError::Config(format!("unknown device kind in '{entry}'")))?;
            if count == 0 {
                continue;
            }
            match out.iter_mut().find(|(k, _)| *k == kind) {
                Some((_, c)) => *c += count,
                None => out.push((kind, count)),
            }
        }
        Ok(out)
    }
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            listen: default_listen(),
            key: None,
            sandbox: default_sandbox(),
            devices: default_devices(),
        }
    }
}

/// Configuration for a routing proxy.
///
/// ```toml
/// listen = "0.0.0.0:9090"
///
/// [routes]
/// rpi4 = "192.168.1.20:9190"
/// jetson = "192.168.1.21:9190"
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_proxy_listen")]
    pub listen: String,
    /// Routing key → upstream peer address.
    #[serde(default)]
    pub routes: BTreeMap<String, String>,
}

fn default_proxy_listen() -> String {
    "0.0.0.0:9090".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: default_proxy_listen(),
            routes: BTreeMap::new(),
        }
    }
}

impl ProxyConfig {
    pub fn from_file(path: &Path) -> Result<Self, PeerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PeerError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self, PeerError> {
        toml::from_str(toml_str).map_err(|e| PeerError::Config(format!("TOML parse error: {e}")))
    }
}
