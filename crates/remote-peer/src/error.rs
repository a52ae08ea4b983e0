// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the peer.

use remote_session::RemoteFault;

/// Errors raised while serving a session.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("configuration error: {0}")]
    Config(String),

    /// A remote path escapes the sandbox or is malformed.
    #[error("rejected path '{path}': {detail}")]
    Sandbox { path: String, detail: String },

    /// A staged file does not exist.
    #[error("staged file '{0}' not found")]
    NotStaged(String),

    #[error("peer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Staged files do not form a loadable module.
    #[error("cannot load module: {0}")]
    Load(String),

    #[error("execution failed: {0}")]
    Exec(String),

    #[error("no execution context for {0}")]
    DeviceUnavailable(String),

    #[error("unknown module {0}")]
    UnknownModule(u64),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("routing key rejected")]
    Unauthorized,

    #[error(transparent)]
    Session(#[from] remote_session::SessionError),
}

impl PeerError {
    /// Category reported to the client.
    pub fn fault(&self) -> RemoteFault {
        match self {
            Self::Sandbox { .. } | Self::InvalidRequest(_) | Self::UnknownModule(_) => {
                RemoteFault::InvalidRequest
            }
            Self::NotStaged(_) => RemoteFault::NotFound,
            Self::Load(_) => RemoteFault::LoadFailed,
            Self::Exec(_) => RemoteFault::ExecFailed,
            Self::DeviceUnavailable(_) => RemoteFault::DeviceUnavailable,
            Self::Unauthorized => RemoteFault::Unauthorized,
            Self::Config(_) | Self::Io(_) | Self::Session(_) => RemoteFault::Internal,
        }
    }
}

impl From<tensor_core::TensorError> for PeerError {
    fn from(e: tensor_core::TensorError) -> Self {
        Self::Exec(e.to_string())
    }
}
