// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The artifact triple.

use crate::BuildError;
use std::path::{Path, PathBuf};

/// One of the three payloads of a [`CompiledArtifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactPart {
    Binary,
    Descriptor,
    Parameters,
}

impl ArtifactPart {
    /// All parts in upload order.
    pub const ALL: [ArtifactPart; 3] = [Self::Binary, Self::Descriptor, Self::Parameters];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Descriptor => "descriptor",
            Self::Parameters => "parameters",
        }
    }

    /// File extension used for this part on disk and on the peer.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Descriptor => "json",
            Self::Parameters => "params",
        }
    }

    /// `<symbol>.<ext>`
    pub fn file_name(self, symbol: &str) -> String {
        format!("{symbol}.{}", self.extension())
    }
}

impl std::fmt::Display for ArtifactPart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unchecked compiler output.
#[derive(Debug, Clone, Default)]
pub struct RawArtifacts {
    pub binary: Vec<u8>,
    pub descriptor: Vec<u8>,
    pub parameters: Vec<u8>,
}

/// A complete, deployable artifact triple.
///
/// All three payloads are present and non-empty; there is no way to
/// construct a partial artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    symbol: String,
    binary: Vec<u8>,
    descriptor: Vec<u8>,
    parameters: Vec<u8>,
}

impl CompiledArtifact {
    pub fn new(symbol: impl Into<String>, raw: RawArtifacts) -> Result<Self, BuildError> {
        let symbol = symbol.into();
        for (part, bytes) in [
            (ArtifactPart::Binary, &raw.binary),
            (ArtifactPart::Descriptor, &raw.descriptor),
            (ArtifactPart::Parameters, &raw.parameters),
        ] {
            if bytes.is_empty() {
                return Err(BuildError::IncompleteArtifact {
                    symbol,
                    part: part.as_str(),
                });
            }
        }
        Ok(Self {
            symbol,
            binary: raw.binary,
            descriptor: raw.descriptor,
            parameters: raw.parameters,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn binary(&self) -> &[u8] {
        &self.binary
    }

    pub fn descriptor(&self) -> &[u8] {
        &self.descriptor
    }

    pub fn parameters(&self) -> &[u8] {
        &self.parameters
    }

    pub fn part(&self, part: ArtifactPart) -> &[u8] {
        match part {
            ArtifactPart::Binary => &self.binary,
            ArtifactPart::Descriptor => &self.descriptor,
            ArtifactPart::Parameters => &self.parameters,
        }
    }

    /// Parts paired with their payloads, in upload order.
    pub fn parts(&self) -> impl Iterator<Item = (ArtifactPart, &[u8])> + '_ {
        ArtifactPart::ALL.into_iter().map(move |p| (p, self.part(p)))
    }

    pub fn total_bytes(&self) -> usize {
        self.binary.len() + self.descriptor.len() + self.parameters.len()
    }

    /// Writes `<symbol>.bin`, `<symbol>.json` and `<symbol>.params` into
    /// `dir`, creating it if needed. Returns the written paths.
    pub fn save_dir(&self, dir: &Path) -> Result<Vec<PathBuf>, BuildError> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(3);
        for (part, bytes) in self.parts() {
            let path = dir.join(part.file_name(&self.symbol));
            std::fs::write(&path, bytes)?;
            written.push(path);
        }
        tracing::debug!(
            "saved artifact '{}' ({} bytes) to {}",
            self.symbol,
            self.total_bytes(),
            dir.display()
        );
        Ok(written)
    }

    /// Reads a previously saved artifact.
    pub fn load_dir(dir: &Path, symbol: &str) -> Result<Self, BuildError> {
        let read = |part: ArtifactPart| std::fs::read(dir.join(part.file_name(symbol)));
        let raw = RawArtifacts {
            binary: read(ArtifactPart::Binary)?,
            descriptor: read(ArtifactPart::Descriptor)?,
            parameters: read(ArtifactPart::Parameters)?,
        };
        Self::new(symbol, raw)
    }

    pub fn summary(&self) -> String {
        format!(
            "Artifact '{}': binary {} B, descriptor {} B, parameters {} B",
            self.symbol,
            self.binary.len(),
            self.descriptor.len(),
            self.parameters.len(),
        )
    }
}
