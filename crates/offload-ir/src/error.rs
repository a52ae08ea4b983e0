// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for module loading and symbol resolution.

/// Errors that can occur when loading or validating a partitioned module.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// The module manifest file could not be read.
    #[error("failed to read module manifest: {0}")]
    ManifestRead(#[from] std::io::Error),

    /// The manifest JSON is malformed.
    #[error("failed to parse module manifest: {0}")]
    ManifestParse(#[from] serde_json::Error),

    /// A function definition is invalid (unbound variable, unknown callee, ...).
    #[error("invalid function '{function}': {detail}")]
    InvalidFunction { function: String, detail: String },

    /// A module-level constant does not match its declared shape.
    #[error("invalid constant '{name}': {detail}")]
    InvalidConstant { name: String, detail: String },

    /// The module as a whole is malformed (empty, duplicate names, call cycle).
    #[error("invalid module: {0}")]
    InvalidModule(String),
}

/// Errors returned by [`crate::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No function carries the tag under the requested name.
    #[error("no function tagged '{tag}' named '{symbol}'")]
    SymbolNotFound { tag: String, symbol: String },

    /// The request does not single out one function.
    #[error("symbol for tag '{tag}' is ambiguous; candidates: {candidates:?}")]
    AmbiguousSymbol { tag: String, candidates: Vec<String> },

    /// The tag or symbol is not a valid identifier.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
