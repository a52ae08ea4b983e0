// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # artifact-builder
//!
//! Turns a resolved [`SubgraphUnit`](offload_ir::SubgraphUnit) into a
//! [`CompiledArtifact`]: three payloads that always travel together.
//!
//! | Part | File | Contents |
//! |---|---|---|
//! | binary | `<symbol>.bin` | native code for the target (a [`KernelLibrary`] for the reference compiler) |
//! | descriptor | `<symbol>.json` | structured graph description ([`GraphDescriptor`]) |
//! | parameters | `<symbol>.params` | named tensors, SafeTensors encoded |
//!
//! # Trait-Based Extensibility
//!
//! The actual code generation is delegated to a [`Compiler`]:
//!
//! ```ignore
//! struct MyCompiler;
//! impl Compiler for MyCompiler {
//!     fn name(&self) -> &str { "mine" }
//!     fn compile(&self, unit: &SubgraphUnit, target: &Target)
//!         -> Result<RawArtifacts, CompileError> { /* ... */ }
//! }
//! let builder = ArtifactBuilder::new(Box::new(MyCompiler));
//! ```
//!
//! [`GraphCompiler`] is the reference implementation whose output the
//! `remote-peer` executor understands.

mod artifact;
mod builder;
mod compiler;
pub mod descriptor;
mod error;
mod graph_compiler;
pub mod kernel_lib;
mod target;

pub use artifact::{ArtifactPart, CompiledArtifact, RawArtifacts};
pub use builder::ArtifactBuilder;
pub use compiler::Compiler;
pub use descriptor::{GraphDescriptor, Node, NodeKind};
pub use error::{BuildError, CompileError, LibraryError};
pub use graph_compiler::GraphCompiler;
pub use kernel_lib::{KernelExport, KernelLibrary};
pub use target::{DeviceKind, Target};
