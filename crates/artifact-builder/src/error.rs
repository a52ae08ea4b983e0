// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for artifact construction.

/// Errors surfaced by [`crate::ArtifactBuilder`] and artifact I/O.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// The compiler rejected the unit or produced an unusable artifact.
    #[error("build of '{symbol}' failed: {diagnostic}")]
    BuildFailed { symbol: String, diagnostic: String },

    /// A target string could not be parsed.
    #[error("invalid target '{0}'")]
    InvalidTarget(String),

    /// One of the three payloads is empty.
    #[error("artifact '{symbol}' is incomplete: {part} payload is empty")]
    IncompleteArtifact { symbol: String, part: &'static str },

    /// Reading or writing artifact files failed.
    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a [`crate::Compiler`].
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Operand shapes do not line up.
    #[error("shape error at '{node}': {detail}")]
    Shape { node: String, detail: String },

    #[error(transparent)]
    Tensor(#[from] tensor_core::TensorError),

    #[error("descriptor encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors decoding a [`crate::KernelLibrary`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LibraryError {
    #[error("not a kernel library (bad magic)")]
    BadMagic,

    #[error("unsupported kernel library version {0}")]
    UnsupportedVersion(u16),

    #[error("kernel library truncated at offset {0}")]
    Truncated(usize),

    #[error("unknown op code {0}")]
    UnknownOp(u8),

    #[error("kernel library contains invalid UTF-8")]
    InvalidUtf8,
}
