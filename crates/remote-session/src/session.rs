// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`RemoteSession`]: a shared connection to one peer.
//!
//! The session owns its transport behind a mutex, so clones of a session
//! used from several threads never interleave frames. Ordering between
//! operations is still the caller's job.

use crate::protocol::procedures;
use crate::{ContextId, Endpoint, Invocation, RemoteFault, Reply, RpcValue, SessionError, Transport};
use artifact_builder::Target;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct SessionShared {
    id: u64,
    endpoint: Endpoint,
    peer: String,
    transport: Mutex<Box<dyn Transport>>,
    closed: AtomicBool,
    context: Mutex<Option<ContextId>>,
}

impl SessionShared {
    fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.transport.lock() {
            Ok(mut t) => {
                if let Err(e) = t.shutdown() {
                    tracing::warn!("session {}: shutdown failed: {e}", self.id);
                }
            }
            Err(_) => tracing::warn!("session {}: transport lock poisoned on close", self.id),
        }
        tracing::info!("session {} to {} closed", self.id, self.endpoint);
    }
}

impl Drop for SessionShared {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A connection to a remote peer plus its negotiated execution context.
///
/// Cheap to clone; all clones share the same connection. The connection is
/// shut down by [`RemoteSession::close`] or when the last clone is dropped.
#[derive(Clone)]
pub struct RemoteSession {
    shared: Arc<SessionShared>,
}

/// A non-owning reference to a [`RemoteSession`].
#[derive(Clone, Default)]
pub struct WeakSession {
    shared: Weak<SessionShared>,
}

impl WeakSession {
    /// Returns the session if it is still alive and open.
    pub fn upgrade(&self) -> Option<RemoteSession> {
        self.shared
            .upgrade()
            .map(|shared| RemoteSession { shared })
            .filter(RemoteSession::is_open)
    }

    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some()
    }
}

impl RemoteSession {
    /// Wraps an established transport.
    pub fn new(endpoint: Endpoint, transport: Box<dyn Transport>) -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let peer = transport.peer_name().to_string();
        tracing::info!("session {id} opened to {endpoint} (peer '{peer}')");
        Self {
            shared: Arc::new(SessionShared {
                id,
                endpoint,
                peer,
                transport: Mutex::new(transport),
                closed: AtomicBool::new(false),
                context: Mutex::new(None),
            }),
        }
    }

    /// Process-unique session number, for logs.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.endpoint
    }

    pub fn peer_name(&self) -> &str {
        &self.shared.peer
    }

    pub fn is_open(&self) -> bool {
        !self.shared.closed.load(Ordering::Acquire)
    }

    pub fn downgrade(&self) -> WeakSession {
        WeakSession {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// `true` if both values refer to the same connection.
    pub fn same_session(&self, other: &RemoteSession) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// The context negotiated by the last successful [`Self::context`] call.
    pub fn active_context(&self) -> Option<ContextId> {
        self.shared.context.lock().ok().and_then(|c| *c)
    }

    /// Asks the peer for an execution context matching `target` and makes
    /// it the active context.
    pub fn context(&self, target: &Target) -> Result<ContextId, SessionError> {
        self.context_for(ContextId::new(target.device(), target.device_index()))
    }

    /// Like [`Self::context`] with an explicit device and index.
    pub fn context_for(&self, wanted: ContextId) -> Result<ContextId, SessionError> {
        let call = Invocation::new(
            procedures::SESSION_CONTEXT,
            vec![
                RpcValue::Str(wanted.device.as_str().to_string()),
                RpcValue::Int(i64::from(wanted.index)),
            ],
        );
        let reply = match self.invoke(call) {
            Ok(r) => r,
            Err(SessionError::Remote {
                kind: RemoteFault::DeviceUnavailable | RemoteFault::InvalidRequest,
                message,
            }) => return Err(SessionError::ContextUnavailable(message)),
            Err(e) => return Err(e),
        };
        let ctx = match reply.value {
            RpcValue::Context(ctx) => ctx,
            other => {
                return Err(SessionError::Protocol(format!(
                    "expected context, got {other:?}"
                )))
            }
        };
        *self
            .shared
            .context
            .lock()
            .map_err(|_| SessionError::Protocol("context lock poisoned".into()))? = Some(ctx);
        tracing::info!("session {}: active context {ctx}", self.id());
        Ok(ctx)
    }

    /// Uploads one file.
    pub fn upload(&self, path: &str, bytes: &[u8]) -> Result<(), SessionError> {
        tracing::debug!("session {}: upload {path} ({} bytes)", self.id(), bytes.len());
        self.with_transport(|t| t.upload(path, bytes))
    }

    pub fn invoke(&self, call: Invocation) -> Result<Reply, SessionError> {
        tracing::debug!("session {}: call {}", self.id(), call.procedure);
        self.with_transport(|t| t.invoke(call))
    }

    /// Shuts the connection down. Idempotent.
    pub fn close(&self) {
        self.shared.shutdown();
    }

    fn with_transport<R>(
        &self,
        f: impl FnOnce(&mut dyn Transport) -> Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        let mut guard = self
            .shared
            .transport
            .lock()
            .map_err(|_| SessionError::Protocol("transport lock poisoned".into()))?;
        // Closed while we were waiting for the lock.
        if !self.is_open() {
            return Err(SessionError::Closed);
        }
        f(&mut **guard)
    }
}

impl std::fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.shared.id)
            .field("endpoint", &self.shared.endpoint)
            .field("open", &self.is_open())
            .field("context", &self.active_context())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use artifact_builder::DeviceKind;
    use std::sync::atomic::AtomicUsize;

    /// Answers `session.context` for cpu only and counts shutdowns.
    struct CpuOnly {
        shutdowns: Arc<AtomicUsize>,
    }

    impl Transport for CpuOnly {
        fn peer_name(&self) -> &str {
            "cpu-only"
        }
        fn upload(&mut self, _: &str, _: &[u8]) -> Result<(), SessionError> {
            Ok(())
        }
        fn invoke(&mut self, call: Invocation) -> Result<Reply, SessionError> {
            match call.args.first().and_then(RpcValue::as_str) {
                Some("cpu") => Ok(Reply::value(RpcValue::Context(ContextId::cpu()))),
                _ => Err(SessionError::Remote {
                    kind: RemoteFault::DeviceUnavailable,
                    message: "no such device".into(),
                }),
            }
        }
        fn shutdown(&mut self) -> Result<(), SessionError> {
            self.shutdowns.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn session() -> (RemoteSession, Arc<AtomicUsize>) {
        let shutdowns = Arc::new(AtomicUsize::new(0));
        let t = CpuOnly {
            shutdowns: shutdowns.clone(),
        };
        (
            RemoteSession::new(Endpoint::new("local", 1, None), Box::new(t)),
            shutdowns,
        )
    }

    #[test]
    fn test_context_negotiation() {
        let (s, _) = session();
        assert_eq!(s.active_context(), None);
        let ctx = s.context(&Target::llvm()).unwrap();
        assert_eq!(ctx.device, DeviceKind::Cpu);
        assert_eq!(s.active_context(), Some(ctx));
    }

    #[test]
    fn test_context_unavailable() {
        let (s, _) = session();
        let err = s.context(&Target::parse("cuda").unwrap()).unwrap_err();
        assert!(matches!(err, SessionError::ContextUnavailable(_)));
        assert_eq!(s.active_context(), None);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (s, shutdowns) = session();
        let clone = s.clone();
        s.close();
        s.close();
        clone.close();
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
        assert!(!clone.is_open());
        assert!(matches!(s.upload("/x", b"").unwrap_err(), SessionError::Closed));
    }

    #[test]
    fn test_drop_shuts_down_and_invalidates_weak() {
        let (s, shutdowns) = session();
        let weak = s.downgrade();
        assert!(weak.is_alive());
        drop(s);
        assert!(!weak.is_alive());
        assert_eq!(shutdowns.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_weak_sees_close() {
        let (s, _) = session();
        let weak = s.downgrade();
        s.close();
        assert!(weak.upgrade().is_none());
    }
}
