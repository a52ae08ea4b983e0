// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON module manifest.
//!
//! # Format
//! ```json
//! {
//!   "name": "add_net",
//!   "constants": {
//!     "one": { "shape": [], "values": [1.0] }
//!   },
//!   "functions": [
//!     {
//!       "name": "add1",
//!       "params": [{ "name": "x", "shape": [4], "dtype": "f32" }],
//!       "body": { "kind": "call", "op": "add", "args": [
//!         { "kind": "var", "name": "x" },
//!         { "kind": "constant", "name": "one" }
//!       ] },
//!       "attrs": { "compiler": "remote", "global_symbol": "add1" }
//!     }
//!   ]
//! }
//! ```

use crate::module::Loaded;
use crate::{Function, IrError, PartitionedModule};
use std::collections::BTreeMap;
use std::path::Path;
use tensor_core::TensorLiteral;

/// On-disk form of a [`PartitionedModule`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    #[serde(default)]
    pub constants: BTreeMap<String, TensorLiteral>,
    pub functions: Vec<Function>,
}

impl ModuleManifest {
    /// Loads a manifest from a JSON file path.
    pub fn from_file(path: &Path) -> Result<Self, IrError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parses a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, IrError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialises the manifest to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, IrError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Converts into an unvalidated module.
    pub fn into_module(self) -> PartitionedModule<Loaded> {
        PartitionedModule::new(self.name, self.functions, self.constants)
    }
}

impl<S: crate::module::ModuleState> From<&PartitionedModule<S>> for ModuleManifest {
    fn from(module: &PartitionedModule<S>) -> Self {
        Self {
            name: module.name.clone(),
            constants: module.constants.clone(),
            functions: module.functions.clone(),
        }
    }
}
