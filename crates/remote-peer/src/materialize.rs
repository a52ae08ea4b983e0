// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Turns a staged artifact triple into a [`GraphExecutor`].

use crate::{GraphExecutor, PeerError, Sandbox};
use artifact_builder::{ArtifactPart, GraphDescriptor, KernelLibrary, Target};
use remote_session::ContextId;
use std::collections::HashMap;
use tensor_core::ParamDict;

fn staged(path: &str, part: ArtifactPart) -> String {
    format!("{path}.{}", part.extension())
}

/// Loads `<path>.bin`, `<path>.json` and `<path>.params` from the sandbox
/// and binds them for execution on `context`.
pub fn materialize(sandbox: &Sandbox, path: &str, context: ContextId) -> Result<GraphExecutor, PeerError> {
    // Binary: the library's target must run on the context's device.
    let bin = sandbox.read(&staged(path, ArtifactPart::Binary))?;
    let library = KernelLibrary::from_bytes(&bin)
        .map_err(|e| PeerError::Load(format!("{}: {e}", staged(path, ArtifactPart::Binary))))?;
    let target = Target::parse(&library.target)
        .map_err(|e| PeerError::Load(format!("kernel library target: {e}")))?;
    if target.device() != context.device {
        return Err(PeerError::Load(format!(
            "module built for {} cannot run on context {context}",
            target.device()
        )));
    }

    let json = sandbox.read(&staged(path, ArtifactPart::Descriptor))?;
    let descriptor = GraphDescriptor::from_json(&json)
        .map_err(|e| PeerError::Load(format!("descriptor: {e}")))?;

    // Parameters are memory-mapped and copied out once.
    let params_path = sandbox.existing(&staged(path, ArtifactPart::Parameters))?;
    let file = std::fs::File::open(&params_path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file) }
        .map_err(|e| PeerError::Load(format!("mmap of {} failed: {e}", params_path.display())))?;
    let params = ParamDict::from_bytes(&mmap)
        .map_err(|e| PeerError::Load(format!("parameters: {e}")))?;
    let params: HashMap<_, _> = params
        .iter()
        .map(|(name, t)| (name.clone(), t.clone()))
        .collect();

    let executor = GraphExecutor::bind(descriptor, params, |name| library.lookup(name))?;
    tracing::info!(
        "materialized '{}' on {context}: {} inputs, {} outputs, {} kernels (build {:016x})",
        path,
        executor.num_inputs(),
        executor.num_outputs(),
        library.exports.len(),
        library.build_id
    );
    Ok(executor)
}
