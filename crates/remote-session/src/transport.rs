// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Collaborator traits for moving bytes to a peer.

use crate::{Endpoint, RpcValue, SessionError};
use std::time::Duration;
use tensor_core::Tensor;

/// A remote procedure call.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub procedure: String,
    pub args: Vec<RpcValue>,
    pub tensors: Vec<Tensor>,
}

impl Invocation {
    pub fn new(procedure: impl Into<String>, args: Vec<RpcValue>) -> Self {
        Self {
            procedure: procedure.into(),
            args,
            tensors: Vec::new(),
        }
    }

    pub fn with_tensors(mut self, tensors: Vec<Tensor>) -> Self {
        self.tensors = tensors;
        self
    }
}

/// Result of an [`Invocation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub value: RpcValue,
    pub tensors: Vec<Tensor>,
}

impl Reply {
    pub fn value(value: RpcValue) -> Self {
        Self {
            value,
            tensors: Vec::new(),
        }
    }
}

/// An established link to a peer.
///
/// Each call blocks until the peer answers or the transport's timeout
/// expires.
pub trait Transport: Send {
    /// Name the peer announced during the handshake.
    fn peer_name(&self) -> &str;

    /// Stores `bytes` at `path` on the peer.
    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), SessionError>;

    fn invoke(&mut self, call: Invocation) -> Result<Reply, SessionError>;

    /// Ends the link. Further calls fail.
    fn shutdown(&mut self) -> Result<(), SessionError>;
}

/// Opens [`Transport`]s.
pub trait Connector: Send + Sync {
    fn connect(
        &self,
        endpoint: &Endpoint,
        client: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Transport>, SessionError>;
}
