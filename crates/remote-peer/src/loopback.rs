// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! In-process transport that drives a [`PeerSession`] directly.

use crate::{Outcome, PeerConfig, PeerError, PeerSession, PeerState};
use remote_session::protocol::{self, Request, Response};
use remote_session::{
    Connector, Endpoint, Invocation, RemoteFault, Reply, SessionError, Transport,
};
use std::sync::Arc;
use std::time::Duration;

/// Opens [`LoopbackTransport`]s against one in-process peer.
///
/// All transports share the peer's sandbox; each has its own module table,
/// like separate TCP connections.
#[derive(Clone)]
pub struct LoopbackConnector {
    state: Arc<PeerState>,
}

impl LoopbackConnector {
    pub fn new(config: &PeerConfig) -> Result<Self, PeerError> {
        Ok(Self {
            state: PeerState::new(config)?,
        })
    }

    pub fn from_state(state: Arc<PeerState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<PeerState> {
        &self.state
    }
}

impl Connector for LoopbackConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        client: &str,
        _timeout: Duration,
    ) -> Result<Box<dyn Transport>, SessionError> {
        let mut transport = LoopbackTransport {
            session: Some(PeerSession::new(self.state.clone())),
            peer: String::new(),
        };
        let hello = Request::Hello {
            key: endpoint.key.clone(),
            client: client.to_string(),
        };
        match transport.exchange(hello, Vec::new()) {
            Ok((Response::Welcome { peer }, _)) => {
                transport.peer = peer;
                Ok(Box::new(transport))
            }
            Ok((other, _)) => Err(SessionError::Protocol(format!(
                "expected welcome, got {other:?}"
            ))),
            Err(SessionError::Remote {
                kind: RemoteFault::Unauthorized,
                message,
            }) => Err(SessionError::ConnectionRefused {
                endpoint: endpoint.to_string(),
                detail: message,
            }),
            Err(e) => Err(e),
        }
    }
}

pub struct LoopbackTransport {
    session: Option<PeerSession>,
    peer: String,
}

impl LoopbackTransport {
    fn exchange(&mut self, request: Request, payload: Vec<u8>) -> Result<(Response, Vec<u8>), SessionError> {
        let session = self.session.as_mut().ok_or(SessionError::Closed)?;
        let (response, payload) = match session.dispatch(request, payload) {
            Outcome::Reply(r, p) => (r, p),
            Outcome::ReplyAndClose(r, p) => {
                self.session = None;
                (r, p)
            }
            Outcome::Close => {
                self.session = None;
                return Err(SessionError::Closed);
            }
        };
        match response {
            Response::Error { kind, message } => Err(SessionError::Remote { kind, message }),
            other => Ok((other, payload)),
        }
    }
}

impl Transport for LoopbackTransport {
    fn peer_name(&self) -> &str {
        &self.peer
    }

    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), SessionError> {
        match self.exchange(
            Request::Upload {
                path: path.to_string(),
            },
            bytes.to_vec(),
        )? {
            (Response::Ack, _) => Ok(()),
            (other, _) => Err(SessionError::Protocol(format!("expected ack, got {other:?}"))),
        }
    }

    fn invoke(&mut self, call: Invocation) -> Result<Reply, SessionError> {
        let (metas, payload) = protocol::pack_tensors(&call.tensors);
        let request = Request::Call {
            procedure: call.procedure,
            args: call.args,
            tensors: metas,
        };
        match self.exchange(request, payload)? {
            (Response::Value { value, tensors }, payload) => Ok(Reply {
                value,
                tensors: protocol::unpack_tensors(&tensors, &payload)?,
            }),
            (other, _) => Err(SessionError::Protocol(format!("expected value, got {other:?}"))),
        }
    }

    fn shutdown(&mut self) -> Result<(), SessionError> {
        self.session = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_session::protocol::procedures;
    use remote_session::{ContextId, RpcValue, SessionConfig, SessionManager};

    fn config(key: Option<&str>) -> PeerConfig {
        PeerConfig {
            key: key.map(str::to_string),
            sandbox: std::env::temp_dir().join(format!("loopback_{}", std::process::id())),
            ..PeerConfig::default()
        }
    }

    #[test]
    fn test_connect_and_context() {
        let connector = LoopbackConnector::new(&config(None)).unwrap();
        let mgr = SessionManager::new(Box::new(connector), SessionConfig::default());
        let session = mgr.connect("loopback", 0, None).unwrap();
        assert_eq!(session.peer_name(), "offload-peer");
        let ctx = session
            .context(&artifact_builder::Target::llvm())
            .unwrap();
        assert_eq!(ctx, ContextId::cpu());
    }

    #[test]
    fn test_key_rejected() {
        let connector = LoopbackConnector::new(&config(Some("edge"))).unwrap();
        let err = connector
            .connect(&Endpoint::new("l", 0, None), "t", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::ConnectionRefused { .. }));
        assert!(connector
            .connect(&Endpoint::new("l", 0, Some("edge".into())), "t", Duration::from_secs(1))
            .is_ok());
    }

    #[test]
    fn test_shutdown_closes() {
        let connector = LoopbackConnector::new(&config(None)).unwrap();
        let mut t = connector
            .connect(&Endpoint::new("l", 0, None), "t", Duration::from_secs(1))
            .unwrap();
        t.shutdown().unwrap();
        let err = t
            .invoke(Invocation::new(procedures::MODULE_FREE, vec![RpcValue::Int(1)]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Closed));
    }
}
