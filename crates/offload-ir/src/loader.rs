// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Module loading from a JSON manifest.

use crate::module::Validated;
use crate::{IrError, ModuleManifest, PartitionedModule};
use std::path::Path;

/// Loads a partitioned module from disk into a validated
/// [`PartitionedModule`].
///
/// # Example
/// ```no_run
/// use offload_ir::ModuleLoader;
/// use std::path::Path;
///
/// let module = ModuleLoader::load(Path::new("./partitioned.json")).unwrap();
/// println!("{}", module.summary());
/// ```
pub struct ModuleLoader;

impl ModuleLoader {
    /// Reads, parses and validates the manifest at `path`.
    pub fn load(path: &Path) -> Result<PartitionedModule<Validated>, IrError> {
        tracing::info!("loading module manifest from {}", path.display());
        let manifest = ModuleManifest::from_file(path)?;
        Self::from_manifest(manifest)
    }

    /// Parses and validates a manifest held in memory.
    pub fn from_json(json: &str) -> Result<PartitionedModule<Validated>, IrError> {
        Self::from_manifest(ModuleManifest::from_json(json)?)
    }

    pub fn from_manifest(manifest: ModuleManifest) -> Result<PartitionedModule<Validated>, IrError> {
        let module = manifest.into_module().validate()?;
        tracing::info!("{}", module.summary());
        Ok(module)
    }
}
