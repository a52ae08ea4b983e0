// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`ArtifactBuilder`]: compiler invocation with all-or-nothing output.

use crate::{BuildError, CompiledArtifact, Compiler, GraphCompiler, Target};
use offload_ir::SubgraphUnit;
use std::time::Instant;

/// Builds [`CompiledArtifact`]s through a pluggable [`Compiler`].
pub struct ArtifactBuilder {
    compiler: Box<dyn Compiler>,
}

impl ArtifactBuilder {
    pub fn new(compiler: Box<dyn Compiler>) -> Self {
        Self { compiler }
    }

    /// Name of the underlying compiler.
    pub fn compiler_name(&self) -> &str {
        self.compiler.name()
    }

    /// Compiles `unit` for `target`.
    ///
    /// Any compiler error, and any empty payload, is reported as
    /// [`BuildError::BuildFailed`]; no partial artifact is returned.
    pub fn build(&self, unit: &SubgraphUnit, target: &Target) -> Result<CompiledArtifact, BuildError> {
        let start = Instant::now();
        tracing::info!(
            "building '{}' for '{}' with compiler '{}'",
            unit.symbol,
            target,
            self.compiler.name()
        );

        let raw = self
            .compiler
            .compile(unit, target)
            .map_err(|e| BuildError::BuildFailed {
                symbol: unit.symbol.clone(),
                diagnostic: e.to_string(),
            })?;

        let artifact = CompiledArtifact::new(unit.symbol.clone(), raw).map_err(|e| {
            BuildError::BuildFailed {
                symbol: unit.symbol.clone(),
                diagnostic: e.to_string(),
            }
        })?;

        tracing::info!(
            "{} (built in {:.1} ms)",
            artifact.summary(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(artifact)
    }
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self::new(Box::new(GraphCompiler::new()))
    }
}
