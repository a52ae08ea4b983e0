// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Compilation targets and the device kinds they run on.

use crate::BuildError;
use std::fmt;

/// Class of device an execution context lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Cuda,
    OpenCl,
    Vulkan,
    Metal,
}

impl DeviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::OpenCl => "opencl",
            Self::Vulkan => "vulkan",
            Self::Metal => "metal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Some(Self::Cpu),
            "cuda" | "gpu" => Some(Self::Cuda),
            "opencl" | "cl" => Some(Self::OpenCl),
            "vulkan" => Some(Self::Vulkan),
            "metal" => Some(Self::Metal),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed target string such as `llvm -mtriple=aarch64-linux-gnu` or
/// `opencl -device=1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    kind: String,
    device: DeviceKind,
    options: Vec<(String, Option<String>)>,
}

impl Target {
    /// Parses a target string.
    ///
    /// The first word names the code generator (`llvm`/`c` for CPU,
    /// `cuda`/`nvptx`, `opencl`, `vulkan`, `metal`); the rest are
    /// `-key=value` or `-flag` options.
    pub fn parse(s: &str) -> Result<Self, BuildError> {
        let mut words = s.split_whitespace();
        let kind = words
            .next()
            .ok_or_else(|| BuildError::InvalidTarget(s.to_string()))?
            .to_lowercase();
        let device = match kind.as_str() {
            "llvm" | "c" => DeviceKind::Cpu,
            "cuda" | "nvptx" => DeviceKind::Cuda,
            "opencl" => DeviceKind::OpenCl,
            "vulkan" => DeviceKind::Vulkan,
            "metal" => DeviceKind::Metal,
            _ => return Err(BuildError::InvalidTarget(s.to_string())),
        };

        let mut options = Vec::new();
        for word in words {
            let opt = word
                .strip_prefix('-')
                .filter(|o| !o.is_empty())
                .ok_or_else(|| BuildError::InvalidTarget(s.to_string()))?;
            match opt.split_once('=') {
                Some((k, v)) => options.push((k.to_string(), Some(v.to_string()))),
                None => options.push((opt.to_string(), None)),
            }
        }

        let target = Self {
            kind,
            device,
            options,
        };
        if let Some(raw) = target.option("device") {
            if raw.parse::<u32>().is_err() {
                return Err(BuildError::InvalidTarget(s.to_string()));
            }
        }
        Ok(target)
    }

    /// Host CPU target.
    pub fn llvm() -> Self {
        Self {
            kind: "llvm".into(),
            device: DeviceKind::Cpu,
            options: Vec::new(),
        }
    }

    /// Code generator name (`"llvm"`, `"cuda"`, ...).
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    /// Device index from `-device=N`, default 0.
    pub fn device_index(&self) -> u32 {
        self.option("device")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Value of a `-key=value` option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.options.iter().any(|(k, _)| k == key)
    }

    pub fn mtriple(&self) -> Option<&str> {
        self.option("mtriple")
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)?;
        for (k, v) in &self.options {
            match v {
                Some(v) => write!(f, " -{k}={v}")?,
                None => write!(f, " -{k}")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Target {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
