// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! tokio TCP server for a peer.

use crate::codec;
use crate::{Outcome, PeerConfig, PeerError, PeerSession, PeerState};
use remote_session::protocol::{Request, Response};
use remote_session::RemoteFault;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

/// Accepts connections and serves each on its own task.
pub struct PeerServer {
    state: Arc<PeerState>,
    listener: TcpListener,
}

impl PeerServer {
    /// Binds to `config.listen`.
    pub async fn bind(config: &PeerConfig) -> Result<Self, PeerError> {
        let state = PeerState::new(config)?;
        let listener = TcpListener::bind(&config.listen).await?;
        tracing::info!("peer '{}' listening on {}", state.name(), listener.local_addr()?);
        Ok(Self { state, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PeerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn state(&self) -> &Arc<PeerState> {
        &self.state
    }

    /// Serves until the process exits.
    pub async fn run(self) -> Result<(), PeerError> {
        self.run_until(std::future::pending()).await
    }

    /// Serves until `shutdown` completes. Connections already accepted keep
    /// running on their tasks.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), PeerError> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("peer '{}' shutting down", self.state.name());
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(e) = serve_connection(state, stream).await {
                            tracing::warn!("connection from {addr} ended with error: {e}");
                        }
                    });
                }
            }
        }
    }
}

/// Runs `work` on tokio's blocking pool. Dispatch touches the filesystem
/// and runs kernels, neither of which may stall a worker thread.
pub(crate) async fn off_runtime<T, F>(work: F) -> Result<T, PeerError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| PeerError::Io(std::io::Error::other(e)))
}

/// Runs the request loop for one connection.
pub(crate) async fn serve_connection(state: Arc<PeerState>, mut stream: TcpStream) -> Result<(), PeerError> {
    stream.set_nodelay(true)?;
    let mut session = PeerSession::new(state);
    loop {
        let Some(frame) = codec::read_frame(&mut stream).await? else {
            tracing::debug!("client disconnected");
            return Ok(());
        };
        let request: Request = match frame.decode() {
            Ok(r) => r,
            Err(e) => {
                let resp = Response::Error {
                    kind: RemoteFault::InvalidRequest,
                    message: e.to_string(),
                };
                codec::write_frame(&mut stream, &resp, &[]).await?;
                return Ok(());
            }
        };
        let payload = frame.payload;
        let (returned, outcome) = off_runtime(move || {
            let outcome = session.dispatch(request, payload);
            (session, outcome)
        })
        .await?;
        session = returned;
        match outcome {
            Outcome::Reply(resp, payload) => codec::write_frame(&mut stream, &resp, &payload).await?,
            Outcome::ReplyAndClose(resp, payload) => {
                codec::write_frame(&mut stream, &resp, &payload).await?;
                return Ok(());
            }
            Outcome::Close => return Ok(()),
        }
    }
}
