// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error taxonomy of the offload pipeline.
//!
//! Lower layers keep their own error enums; everything that reaches a
//! caller of this crate is folded into [`OffloadError`] here.

use crate::DeployState;
use artifact_builder::{ArtifactPart, BuildError};
use offload_ir::{IrError, ResolveError};
use remote_session::{RemoteFault, SessionError};
use std::fmt;

/// The step of a deploy (or of a later handle operation) an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Resolve,
    Build,
    Connect,
    Context,
    Upload(ArtifactPart),
    Materialize,
    Run,
    Release,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => f.write_str("resolve"),
            Self::Build => f.write_str("build"),
            Self::Connect => f.write_str("connect"),
            Self::Context => f.write_str("context"),
            Self::Upload(part) => write!(f, "upload({part})"),
            Self::Materialize => f.write_str("materialize"),
            Self::Run => f.write_str("run"),
            Self::Release => f.write_str("release"),
        }
    }
}

/// Errors surfaced by the offload pipeline.
///
/// Every error aborts the attempt that raised it. Nothing is retried
/// internally.
#[derive(Debug, thiserror::Error)]
pub enum OffloadError {
    /// No function carries the requested tag and symbol.
    #[error("no function tagged '{tag}' named '{symbol}'")]
    SymbolNotFound { tag: String, symbol: String },

    /// The request matched more than one function, or omitted the symbol.
    #[error("ambiguous symbol for tag '{tag}'; candidates: {candidates:?}")]
    AmbiguousSymbol { tag: String, candidates: Vec<String> },

    /// Tag or symbol is not a valid identifier.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The compiler rejected the unit or produced an incomplete artifact.
    #[error("build failed: {0}")]
    BuildFailed(String),

    /// The peer (or the routing proxy) could not be reached.
    #[error("connection to {endpoint} refused: {detail}")]
    ConnectionRefused { endpoint: String, detail: String },

    /// A blocking network operation exceeded its timeout.
    #[error("timed out during {stage}")]
    Timeout { stage: Stage },

    /// The peer cannot provide the requested execution context, or none
    /// was negotiated before materializing.
    #[error("execution context unavailable: {0}")]
    ContextUnavailable(String),

    /// Transferring one artifact part failed.
    #[error("upload of {part} failed: {detail}")]
    UploadFailed { part: ArtifactPart, detail: String },

    /// The peer could not materialize the staged artifact.
    #[error("remote load failed: {0}")]
    LoadFailed(String),

    /// The handle's session is closed or gone, or the handle was released.
    #[error("remote handle is no longer valid")]
    HandleInvalid,

    /// The peer failed to execute a materialized module.
    #[error("remote invocation failed: {0}")]
    InvokeFailed(String),

    /// A deploy attempt was asked to make a transition its state forbids.
    #[error("illegal deploy transition {from} -> {to}")]
    InvalidTransition { from: DeployState, to: DeployState },

    /// Any other session failure.
    #[error("session error during {stage}: {source}")]
    Session {
        stage: Stage,
        #[source]
        source: SessionError,
    },

    /// The partitioned module could not be loaded.
    #[error("module error: {0}")]
    Module(#[from] IrError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl OffloadError {
    /// Folds a session error raised while performing `stage`.
    pub fn at(stage: Stage, err: SessionError) -> Self {
        match err {
            SessionError::ConnectionRefused { endpoint, detail } => {
                Self::ConnectionRefused { endpoint, detail }
            }
            SessionError::Timeout { .. } => Self::Timeout { stage },
            SessionError::ContextUnavailable(detail) => Self::ContextUnavailable(detail),
            SessionError::Config(detail) => Self::Config(detail),
            SessionError::Remote {
                kind: RemoteFault::DeviceUnavailable,
                message,
            } => Self::ContextUnavailable(message),
            other => match stage {
                Stage::Upload(part) => Self::UploadFailed {
                    part,
                    detail: other.to_string(),
                },
                Stage::Materialize => Self::LoadFailed(other.to_string()),
                Stage::Run => Self::InvokeFailed(other.to_string()),
                _ => Self::Session {
                    stage,
                    source: other,
                },
            },
        }
    }

    /// The stage this error belongs to, where one applies.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::SymbolNotFound { .. } | Self::AmbiguousSymbol { .. } | Self::InvalidQuery(_) => {
                Some(Stage::Resolve)
            }
            Self::BuildFailed(_) => Some(Stage::Build),
            Self::ConnectionRefused { .. } => Some(Stage::Connect),
            Self::Timeout { stage } | Self::Session { stage, .. } => Some(*stage),
            Self::ContextUnavailable(_) => Some(Stage::Context),
            Self::UploadFailed { part, .. } => Some(Stage::Upload(*part)),
            Self::LoadFailed(_) => Some(Stage::Materialize),
            Self::InvokeFailed(_) => Some(Stage::Run),
            Self::HandleInvalid
            | Self::InvalidTransition { .. }
            | Self::Module(_)
            | Self::Config(_) => None,
        }
    }
}

impl From<ResolveError> for OffloadError {
    fn from(e: ResolveError) -> Self {
        match e {
            ResolveError::SymbolNotFound { tag, symbol } => Self::SymbolNotFound { tag, symbol },
            ResolveError::AmbiguousSymbol { tag, candidates } => {
                Self::AmbiguousSymbol { tag, candidates }
            }
            ResolveError::InvalidQuery(q) => Self::InvalidQuery(q),
        }
    }
}

impl From<BuildError> for OffloadError {
    fn from(e: BuildError) -> Self {
        match e {
            BuildError::InvalidTarget(t) => Self::Config(format!("invalid target '{t}'")),
            BuildError::BuildFailed { diagnostic, .. } => Self::BuildFailed(diagnostic),
            other => Self::BuildFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_keeps_stage() {
        let e = OffloadError::at(
            Stage::Upload(ArtifactPart::Parameters),
            SessionError::Timeout { op: "upload".into() },
        );
        assert!(matches!(e, OffloadError::Timeout { .. }));
        assert_eq!(e.stage(), Some(Stage::Upload(ArtifactPart::Parameters)));
    }

    #[test]
    fn test_upload_failure_names_part() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let e = OffloadError::at(Stage::Upload(ArtifactPart::Descriptor), SessionError::Io(io));
        match &e {
            OffloadError::UploadFailed { part, .. } => assert_eq!(*part, ArtifactPart::Descriptor),
            other => panic!("unexpected {other:?}"),
        }
        assert!(e.to_string().contains("descriptor"));
    }

    #[test]
    fn test_remote_load_fault() {
        let e = OffloadError::at(
            Stage::Materialize,
            SessionError::Remote {
                kind: RemoteFault::LoadFailed,
                message: "bad descriptor".into(),
            },
        );
        assert!(matches!(e, OffloadError::LoadFailed(ref m) if m.contains("bad descriptor")));
    }

    #[test]
    fn test_device_fault_is_context_unavailable() {
        let e = OffloadError::at(
            Stage::Materialize,
            SessionError::Remote {
                kind: RemoteFault::DeviceUnavailable,
                message: "cuda(0)".into(),
            },
        );
        assert!(matches!(e, OffloadError::ContextUnavailable(_)));
    }

    #[test]
    fn test_resolve_errors_fold() {
        let e: OffloadError = ResolveError::SymbolNotFound {
            tag: "remote".into(),
            symbol: "f".into(),
        }
        .into();
        assert!(matches!(e, OffloadError::SymbolNotFound { .. }));
        assert_eq!(e.stage(), Some(Stage::Resolve));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Upload(ArtifactPart::Binary).to_string(), "upload(binary)");
        assert_eq!(Stage::Materialize.to_string(), "materialize");
    }
}
