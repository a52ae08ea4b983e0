// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Client configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! host = "192.168.1.20"
//! port = 9190
//! key = "jetson"              # optional, routes through a proxy
//! staging_root = "staging"
//! target = "llvm -mtriple=aarch64-linux-gnu"
//! tag = "remote"
//! symbol = "add1"
//! compile = true
//! timeout_ms = 10000
//! ```

use crate::OffloadError;
use artifact_builder::Target;
use offload_ir::is_identifier;
use remote_session::{Endpoint, SessionConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for one offload: where to send what.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OffloadConfig {
    /// Peer (or proxy) host.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Routing key, when connecting through a proxy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Remote directory the artifact triple is staged under.
    #[serde(default = "default_staging_root")]
    pub staging_root: String,
    /// Compilation target, e.g. `"llvm"` or `"cuda -device=1"`.
    #[serde(default = "default_target")]
    pub target: String,
    /// Backend tag the subfunction carries.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Name of the subfunction to offload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// When false, no fresh build is made: an artifact is read from
    /// `artifact_dir`, or, without one, the already-staged files are
    /// materialized as they are.
    #[serde(default = "default_true")]
    pub compile: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_dir: Option<PathBuf>,
    /// Bound on connect and every blocking transfer, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9190
}

fn default_staging_root() -> String {
    "staging".to_string()
}

fn default_target() -> String {
    "llvm".to_string()
}

fn default_tag() -> String {
    "remote".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl OffloadConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, OffloadError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            OffloadError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, OffloadError> {
        toml::from_str(toml_str).map_err(|e| OffloadError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, OffloadError> {
        toml::to_string_pretty(self)
            .map_err(|e| OffloadError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses [`Self::target`].
    pub fn parse_target(&self) -> Result<Target, OffloadError> {
        Ok(Target::parse(&self.target)?)
    }

    /// The symbol to offload; an unset symbol is an error.
    pub fn require_symbol(&self) -> Result<&str, OffloadError> {
        self.symbol
            .as_deref()
            .ok_or_else(|| OffloadError::Config("no symbol configured".into()))
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port, self.key.clone())
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::with_timeout(Duration::from_millis(self.timeout_ms))
    }

    /// Checks the fields that can be checked without a network.
    pub fn validate(&self) -> Result<(), OffloadError> {
        if self.host.is_empty() {
            return Err(OffloadError::Config("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(OffloadError::Config("port must not be 0".into()));
        }
        if self.staging_root.is_empty() || self.staging_root.split('/').any(|c| c == "..") {
            return Err(OffloadError::Config(format!(
                "invalid staging root '{}'",
                self.staging_root
            )));
        }
        if !is_identifier(&self.tag) {
            return Err(OffloadError::InvalidQuery(format!("invalid tag '{}'", self.tag)));
        }
        self.parse_target()?;
        Ok(())
    }
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            key: None,
            staging_root: default_staging_root(),
            target: default_target(),
            tag: default_tag(),
            symbol: None,
            compile: true,
            artifact_dir: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_builder::DeviceKind;

    #[test]
    fn test_default() {
        let c = OffloadConfig::default();
        assert_eq!(c.port, 9190);
        assert_eq!(c.tag, "remote");
        assert!(c.compile);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
host = "10.0.0.7"
port = 9090
key = "jetson"
target = "cuda -device=1"
symbol = "add1"
compile = false
timeout_ms = 2500
"#;
        let c = OffloadConfig::from_toml(toml).unwrap();
        assert_eq!(c.host, "10.0.0.7");
        assert_eq!(c.key.as_deref(), Some("jetson"));
        assert_eq!(c.require_symbol().unwrap(), "add1");
        assert!(!c.compile);
        assert_eq!(c.session_config().timeout(), Duration::from_millis(2500));

        let target = c.parse_target().unwrap();
        assert_eq!(target.device(), DeviceKind::Cuda);
        assert_eq!(target.device_index(), 1);

        let ep = c.endpoint();
        assert_eq!(ep.addr(), "10.0.0.7:9090");
    }

    #[test]
    fn test_to_toml_roundtrip() {
        let c = OffloadConfig {
            symbol: Some("mlp".into()),
            key: Some("k".into()),
            ..Default::default()
        };
        let toml = c.to_toml().unwrap();
        let back = OffloadConfig::from_toml(&toml).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_missing_symbol() {
        let c = OffloadConfig::default();
        assert!(matches!(c.require_symbol(), Err(OffloadError::Config(_))));
    }

    #[test]
    fn test_validate_rejects() {
        let bad_target = OffloadConfig {
            target: "fpga".into(),
            ..Default::default()
        };
        assert!(matches!(bad_target.validate(), Err(OffloadError::Config(_))));

        let bad_root = OffloadConfig {
            staging_root: "a/../b".into(),
            ..Default::default()
        };
        assert!(bad_root.validate().is_err());

        let bad_tag = OffloadConfig {
            tag: "re mote".into(),
            ..Default::default()
        };
        assert!(matches!(bad_tag.validate(), Err(OffloadError::InvalidQuery(_))));
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            OffloadConfig::from_toml("port = \"x\""),
            Err(OffloadError::Config(_))
        ));
    }
}
