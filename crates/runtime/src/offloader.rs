// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The offload pipeline with type-state–enforced steps.
//!
//! ```text
//! Offloader<Idle>
//!     │  .resolve(module)
//!     ▼
//! Offloader<Resolved> ──.attach(session)──► RemoteHandle   (already staged)
//!     │  .build(builder, target) | .with_artifact(artifact)
//!     ▼
//! Offloader<Built>
//!     │  .deploy(session)
//!     ▼
//!   RemoteHandle
//! ```
//!
//! Each state transition consumes the old value and returns a new one.
//! A built offloader can deploy the same artifact to several sessions.

use crate::{DeployMetrics, OffloadConfig, OffloadError, RemoteHandle, RemoteLoader};
use artifact_builder::{ArtifactBuilder, CompiledArtifact, Target};
use offload_ir::module::Validated;
use offload_ir::{PartitionedModule, SubgraphUnit};
use remote_session::RemoteSession;
use std::time::Instant;

// ── Type-state markers ─────────────────────────────────────────

/// Nothing resolved yet.
#[derive(Debug)]
pub struct Idle;

/// The symbol was found and extracted.
#[derive(Debug)]
pub struct Resolved {
    unit: SubgraphUnit,
}

/// An artifact is ready to upload.
#[derive(Debug)]
pub struct Built {
    unit: SubgraphUnit,
    artifact: CompiledArtifact,
}

/// Sealed trait for offloader states.
pub trait OffloadState: std::fmt::Debug {}
impl OffloadState for Idle {}
impl OffloadState for Resolved {}
impl OffloadState for Built {}

// ── Offloader ──────────────────────────────────────────────────

/// Drives one symbol from a partitioned module to a ready [`RemoteHandle`].
pub struct Offloader<S: OffloadState = Idle> {
    tag: String,
    symbol: String,
    loader: RemoteLoader,
    metrics: DeployMetrics,
    state: S,
}

impl<S: OffloadState> Offloader<S> {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn loader(&self) -> &RemoteLoader {
        &self.loader
    }

    /// Metrics of the steps taken so far.
    pub fn metrics(&self) -> &DeployMetrics {
        &self.metrics
    }

    fn into_state<T: OffloadState>(self, state: T) -> Offloader<T> {
        Offloader {
            tag: self.tag,
            symbol: self.symbol,
            loader: self.loader,
            metrics: self.metrics,
            state,
        }
    }
}

// ── Idle → Resolved ────────────────────────────────────────────

impl Offloader<Idle> {
    pub fn new(tag: impl Into<String>, symbol: impl Into<String>, staging_root: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            symbol: symbol.into(),
            loader: RemoteLoader::new(staging_root),
            metrics: DeployMetrics::new(),
            state: Idle,
        }
    }

    /// Creates an offloader for the configured tag, symbol and staging root.
    pub fn from_config(config: &OffloadConfig) -> Result<Self, OffloadError> {
        config.validate()?;
        let symbol = config.require_symbol()?;
        Ok(Self::new(config.tag.clone(), symbol, config.staging_root.clone()))
    }

    /// Finds the tagged symbol in `module` and extracts it.
    pub fn resolve(
        mut self,
        module: &PartitionedModule<Validated>,
    ) -> Result<Offloader<Resolved>, OffloadError> {
        let start = Instant::now();
        let unit = offload_ir::resolve(module, &self.tag, &self.symbol)?;
        self.metrics.resolve_duration = start.elapsed();
        tracing::info!("{}", unit.summary());
        Ok(self.into_state(Resolved { unit }))
    }
}

// ── Resolved → Built ───────────────────────────────────────────

impl Offloader<Resolved> {
    pub fn unit(&self) -> &SubgraphUnit {
        &self.state.unit
    }

    /// Compiles the unit for `target`.
    pub fn build(
        mut self,
        builder: &ArtifactBuilder,
        target: &Target,
    ) -> Result<Offloader<Built>, OffloadError> {
        let start = Instant::now();
        let artifact = builder.build(&self.state.unit, target)?;
        self.metrics.build_duration = start.elapsed();
        let unit = self.state.unit.clone();
        Ok(self.into_state(Built { unit, artifact }))
    }

    /// Uses an existing artifact instead of compiling.
    pub fn with_artifact(self, artifact: CompiledArtifact) -> Result<Offloader<Built>, OffloadError> {
        if artifact.symbol() != self.symbol {
            return Err(OffloadError::Config(format!(
                "artifact for '{}' cannot be deployed as '{}'",
                artifact.symbol(),
                self.symbol
            )));
        }
        tracing::info!("reusing {}", artifact.summary());
        let unit = self.state.unit.clone();
        Ok(self.into_state(Built { unit, artifact }))
    }

    /// Materializes the files already staged for this symbol on the
    /// session's peer, without building or uploading.
    pub fn attach(&self, session: &RemoteSession) -> Result<RemoteHandle, OffloadError> {
        self.loader
            .materialize_existing_with(session, &self.symbol, self.metrics.clone())
    }
}

// ── Built: deploy ──────────────────────────────────────────────

impl Offloader<Built> {
    pub fn unit(&self) -> &SubgraphUnit {
        &self.state.unit
    }

    pub fn artifact(&self) -> &CompiledArtifact {
        &self.state.artifact
    }

    /// Uploads the artifact through `session` and materializes it in the
    /// session's active context.
    pub fn deploy(&self, session: &RemoteSession) -> Result<RemoteHandle, OffloadError> {
        self.loader
            .deploy_with(session, &self.symbol, &self.state.artifact, self.metrics.clone())
    }
}

impl<S: OffloadState> std::fmt::Debug for Offloader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Offloader")
            .field("state", &std::any::type_name::<S>())
            .field("tag", &self.tag)
            .field("symbol", &self.symbol)
            .field("staging_root", &self.loader.staging_root())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_ir::{Expr, Function, ModuleLoader, OpKind, Param};
    use tensor_core::Shape;

    fn module() -> PartitionedModule<Validated> {
        let add1 = Function::new(
            "add1",
            vec![Param::new("x", Shape::new(vec![4]))],
            Expr::call(OpKind::Add, vec![Expr::var("x"), Expr::constant("one")]),
        )
        .with_tag("remote");
        let host = Function::new(
            "main",
            vec![Param::new("x", Shape::new(vec![4]))],
            Expr::call_function("add1", vec![Expr::var("x")]),
        );
        let mut constants = std::collections::BTreeMap::new();
        constants.insert(
            "one".to_string(),
            tensor_core::TensorLiteral {
                shape: Shape::new(vec![4]),
                values: vec![1.0; 4],
            },
        );
        PartitionedModule::new("m", vec![host, add1], constants)
            .validate()
            .unwrap()
    }

    #[test]
    fn test_resolve_and_build() {
        let resolved = Offloader::new("remote", "add1", "staging")
            .resolve(&module())
            .unwrap();
        assert_eq!(resolved.unit().input_names(), vec!["x".to_string()]);

        let built = resolved
            .build(&ArtifactBuilder::default(), &Target::llvm())
            .unwrap();
        assert_eq!(built.artifact().symbol(), "add1");
    }

    #[test]
    fn test_unknown_symbol() {
        let err = Offloader::new("remote", "nope", "staging")
            .resolve(&module())
            .unwrap_err();
        assert!(matches!(err, OffloadError::SymbolNotFound { .. }));
    }

    #[test]
    fn test_untagged_function_not_offloaded() {
        let err = Offloader::new("remote", "main", "staging")
            .resolve(&module())
            .unwrap_err();
        assert!(matches!(err, OffloadError::SymbolNotFound { .. }));
    }

    #[test]
    fn test_foreign_artifact_rejected() {
        let resolved = Offloader::new("remote", "add1", "staging")
            .resolve(&module())
            .unwrap();
        let other = CompiledArtifact::new(
            "mlp",
            artifact_builder::RawArtifacts {
                binary: vec![1],
                descriptor: vec![2],
                parameters: vec![3],
            },
        )
        .unwrap();
        assert!(matches!(
            resolved.with_artifact(other),
            Err(OffloadError::Config(_))
        ));
    }

    #[test]
    fn test_from_config_requires_symbol() {
        let config = OffloadConfig::default();
        assert!(Offloader::from_config(&config).is_err());

        let config = OffloadConfig {
            symbol: Some("add1".into()),
            ..Default::default()
        };
        let off = Offloader::from_config(&config).unwrap();
        assert_eq!(off.symbol(), "add1");
        assert_eq!(off.loader().deploy_path("add1").base(), "staging/add1");
    }

    #[test]
    fn test_manifest_module() {
        let json = r#"{
            "name": "m",
            "functions": [
                {"name": "neg", "params": [{"name": "x", "shape": [2]}],
                 "body": {"kind": "call", "op": "negate", "args": [{"kind": "var", "name": "x"}]},
                 "attrs": {"compiler": "remote"}}
            ]
        }"#;
        let module = ModuleLoader::from_json(json).unwrap();
        let resolved = Offloader::new("remote", "neg", "s").resolve(&module).unwrap();
        assert_eq!(resolved.unit().num_outputs(), 1);
    }
}
