// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # offload-ir
//!
//! A small intermediate representation for graphs that have already been
//! partitioned between a host and one or more offload backends.
//!
//! - [`Expr`] — dataflow expressions (variables, constants, operator calls,
//!   calls into other functions, multi-output tuples).
//! - [`Function`] — a named function with typed parameters and an optional
//!   backend tag (`attrs.compiler`).
//! - [`PartitionedModule`] — the whole module with a **type-state pattern**
//!   (`Loaded` → `Validated`).
//! - [`ModuleLoader`] / [`ModuleManifest`] — the JSON module format.
//! - [`resolve`] — finds the single function carrying a backend tag and a
//!   symbol name and extracts it as a standalone [`SubgraphUnit`].
//!
//! # Example
//! ```no_run
//! use offload_ir::{resolve, ModuleLoader};
//! use std::path::Path;
//!
//! let module = ModuleLoader::load(Path::new("./partitioned.json")).unwrap();
//! let unit = resolve(&module, "remote", "add1").unwrap();
//! println!("{}", unit.summary());
//! ```

mod error;
mod expr;
mod function;
mod loader;
mod manifest;
pub mod module;
mod resolver;

pub use error::{IrError, ResolveError};
pub use expr::{Expr, OpKind};
pub use function::{Function, FunctionAttrs, Param};
pub use loader::ModuleLoader;
pub use manifest::ModuleManifest;
pub use module::PartitionedModule;
pub use resolver::{candidates, is_identifier, resolve, resolve_tag_only, SubgraphUnit};
