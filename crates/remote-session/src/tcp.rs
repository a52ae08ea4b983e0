// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Blocking TCP transport.

use crate::protocol::{self, Request, Response};
use crate::{Connector, Endpoint, Invocation, RemoteFault, Reply, SessionError, Transport};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Connects over TCP, optionally through a routing proxy.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    fn connect(
        &self,
        endpoint: &Endpoint,
        client: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Transport>, SessionError> {
        Ok(Box::new(TcpTransport::connect(endpoint, client, timeout)?))
    }
}

/// One TCP connection speaking the framed protocol.
pub struct TcpTransport {
    stream: TcpStream,
    peer: String,
    open: bool,
}

impl TcpTransport {
    /// Connects and performs the hello/welcome handshake.
    pub fn connect(endpoint: &Endpoint, client: &str, timeout: Duration) -> Result<Self, SessionError> {
        let refused = |detail: String| SessionError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            detail,
        };

        let addrs: Vec<_> = endpoint
            .addr()
            .to_socket_addrs()
            .map_err(|e| refused(format!("cannot resolve: {e}")))?
            .collect();
        if addrs.is_empty() {
            return Err(refused("no addresses".into()));
        }

        let mut last_err = None;
        let mut stream = None;
        for addr in &addrs {
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        let stream = match (stream, last_err) {
            (Some(s), _) => s,
            (None, Some(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                return Err(SessionError::Timeout {
                    op: format!("connect to {endpoint}"),
                })
            }
            (None, e) => {
                return Err(refused(
                    e.map(|e| e.to_string()).unwrap_or_else(|| "unreachable".into()),
                ))
            }
        };

        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;

        let mut transport = Self {
            stream,
            peer: String::new(),
            open: true,
        };
        let hello = Request::Hello {
            key: endpoint.key.clone(),
            client: client.to_string(),
        };
        match transport.exchange(&hello, &[], "handshake") {
            Ok((Response::Welcome { peer }, _)) => {
                tracing::debug!("connected to {endpoint} (peer '{peer}')");
                transport.peer = peer;
                Ok(transport)
            }
            Ok((other, _)) => Err(SessionError::Protocol(format!(
                "expected welcome, got {other:?}"
            ))),
            Err(SessionError::Remote {
                kind: RemoteFault::Unauthorized | RemoteFault::Unreachable,
                message,
            }) => Err(refused(message)),
            Err(e) => Err(e),
        }
    }

    /// Sends one request and reads one response. Peer-reported errors
    /// become [`SessionError::Remote`].
    fn exchange(
        &mut self,
        request: &Request,
        payload: &[u8],
        op: &str,
    ) -> Result<(Response, Vec<u8>), SessionError> {
        if !self.open {
            return Err(SessionError::Closed);
        }
        protocol::write_frame(&mut self.stream, request, payload).map_err(|e| retag(e, op))?;
        let (response, payload): (Response, Vec<u8>) =
            protocol::read_frame(&mut self.stream).map_err(|e| retag(e, op))?;
        match response {
            Response::Error { kind, message } => Err(SessionError::Remote { kind, message }),
            other => Ok((other, payload)),
        }
    }
}

fn retag(err: SessionError, op: &str) -> SessionError {
    match err {
        SessionError::Timeout { .. } => SessionError::Timeout { op: op.to_string() },
        other => other,
    }
}

impl Transport for TcpTransport {
    fn peer_name(&self) -> &str {
        &self.peer
    }

    fn upload(&mut self, path: &str, bytes: &[u8]) -> Result<(), SessionError> {
        let op = format!("upload of {path}");
        let request = Request::Upload {
            path: path.to_string(),
        };
        match self.exchange(&request, bytes, &op)? {
            (Response::Ack, _) => Ok(()),
            (other, _) => Err(SessionError::Protocol(format!("expected ack, got {other:?}"))),
        }
    }

    fn invoke(&mut self, call: Invocation) -> Result<Reply, SessionError> {
        let (metas, payload) = protocol::pack_tensors(&call.tensors);
        let op = call.procedure.clone();
        let request = Request::Call {
            procedure: call.procedure,
            args: call.args,
            tensors: metas,
        };
        match self.exchange(&request, &payload, &op)? {
            (Response::Value { value, tensors }, payload) => Ok(Reply {
                value,
                tensors: protocol::unpack_tensors(&tensors, &payload)?,
            }),
            (other, _) => Err(SessionError::Protocol(format!(
                "expected value, got {other:?}"
            ))),
        }
    }

    fn shutdown(&mut self) -> Result<(), SessionError> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let bye = protocol::write_frame(&mut self.stream, &Request::Bye, &[]);
        let _ = self.stream.shutdown(Shutdown::Both);
        bye
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{read_frame, write_frame};
    use crate::RpcValue;
    use std::net::TcpListener;

    /// Serves one connection with a scripted peer.
    fn fake_peer(require_key: Option<&'static str>) -> (u16, std::thread::JoinHandle<Vec<Request>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (mut s, _) = listener.accept().unwrap();
            let mut seen = Vec::new();
            loop {
                let (req, _payload): (Request, Vec<u8>) = match read_frame(&mut s) {
                    Ok(f) => f,
                    Err(_) => break,
                };
                seen.push(req.clone());
                let resp = match req {
                    Request::Hello { key, .. } if key.as_deref() != require_key => {
                        Response::Error {
                            kind: RemoteFault::Unauthorized,
                            message: "bad key".into(),
                        }
                    }
                    Request::Hello { .. } => Response::Welcome { peer: "fake".into() },
                    Request::Upload { .. } => Response::Ack,
                    Request::Call { .. } => Response::Value {
                        value: RpcValue::Int(7),
                        tensors: vec![],
                    },
                    Request::Bye => break,
                };
                write_frame(&mut s, &resp, &[]).unwrap();
            }
            seen
        });
        (port, handle)
    }

    #[test]
    fn test_handshake_upload_invoke() {
        let (port, peer) = fake_peer(None);
        let ep = Endpoint::new("127.0.0.1", port, None);
        let mut t = TcpTransport::connect(&ep, "test", Duration::from_secs(5)).unwrap();
        assert_eq!(t.peer_name(), "fake");
        t.upload("/tmp/f.bin", b"abc").unwrap();
        let reply = t.invoke(Invocation::new("x.y", vec![])).unwrap();
        assert_eq!(reply.value, RpcValue::Int(7));
        t.shutdown().unwrap();
        assert!(matches!(t.upload("/tmp/g", b"").unwrap_err(), SessionError::Closed));

        let seen = peer.join().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[1], Request::Upload { path: "/tmp/f.bin".into() });
    }

    #[test]
    fn test_wrong_key_refused() {
        let (port, _peer) = fake_peer(Some("secret"));
        let ep = Endpoint::new("127.0.0.1", port, Some("guess".into()));
        let err = TcpTransport::connect(&ep, "test", Duration::from_secs(5))
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::ConnectionRefused { .. }));
    }

    #[test]
    fn test_nothing_listening_refused() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let ep = Endpoint::new("127.0.0.1", port, None);
        let err = TcpConnector
            .connect(&ep, "test", Duration::from_secs(2))
            .err()
            .unwrap();
        assert!(matches!(err, SessionError::ConnectionRefused { .. }));
    }
}
