// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for sessions and transports.

use std::fmt;

/// Category of a failure reported by the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteFault {
    /// The routing key was rejected.
    Unauthorized,
    /// The request was malformed or used an unknown procedure.
    InvalidRequest,
    /// No execution context matches the requested device.
    DeviceUnavailable,
    /// A staged file is missing or unreadable.
    NotFound,
    /// Staged files could not be turned into a runnable module.
    LoadFailed,
    /// A module failed while running.
    ExecFailed,
    /// A routing proxy could not reach the peer behind the key.
    Unreachable,
    Internal,
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidRequest => "invalid request",
            Self::DeviceUnavailable => "device unavailable",
            Self::NotFound => "not found",
            Self::LoadFailed => "load failed",
            Self::ExecFailed => "execution failed",
            Self::Unreachable => "peer unreachable",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Errors raised by sessions and transports.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The peer (or routing proxy) could not be reached or refused us.
    #[error("connection to {endpoint} refused: {detail}")]
    ConnectionRefused { endpoint: String, detail: String },

    /// An operation did not complete within the configured timeout.
    #[error("timed out during {op}")]
    Timeout { op: String },

    /// The peer has no execution context for the requested device.
    #[error("execution context unavailable: {0}")]
    ContextUnavailable(String),

    /// The session was closed.
    #[error("session is closed")]
    Closed,

    /// The peer sent something we could not understand.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The peer reported a failure.
    #[error("remote {kind}: {message}")]
    Remote { kind: RemoteFault, message: String },

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SessionError {
    /// Maps an I/O error raised during `op`, turning timeouts into
    /// [`SessionError::Timeout`].
    pub fn from_io(op: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => Self::Timeout {
                op: op.to_string(),
            },
            _ => Self::Io(err),
        }
    }

    /// `true` for failures that leave the connection in an unknown state.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Protocol(_) | Self::Io(_) | Self::Closed
        )
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(e: serde_json::Error) -> Self {
        Self::Protocol(e.to_string())
    }
}

impl From<tensor_core::TensorError> for SessionError {
    fn from(e: tensor_core::TensorError) -> Self {
        Self::Protocol(e.to_string())
    }
}
