// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Compiler`] collaborator trait.

use crate::{CompileError, RawArtifacts, Target};
use offload_ir::SubgraphUnit;

/// Lowers a resolved unit into the three artifact payloads.
///
/// Implementations must be deterministic in the descriptor and parameters
/// they emit for a given input; the binary may carry build-specific bytes.
pub trait Compiler: Send + Sync {
    /// Human-readable name of this compiler.
    fn name(&self) -> &str;

    fn compile(&self, unit: &SubgraphUnit, target: &Target) -> Result<RawArtifacts, CompileError>;
}
