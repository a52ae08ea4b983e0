// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Routing proxy: forwards a session to the peer registered under the
//! routing key presented in the client's hello.

use crate::codec;
use crate::{PeerError, ProxyConfig};
use remote_session::protocol::{Request, Response};
use remote_session::RemoteFault;
use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};

pub struct RoutingProxy {
    routes: Arc<BTreeMap<String, String>>,
    listener: TcpListener,
}

impl RoutingProxy {
    pub async fn bind(config: &ProxyConfig) -> Result<Self, PeerError> {
        let listener = TcpListener::bind(&config.listen).await?;
        tracing::info!(
            "routing proxy on {} with {} route(s)",
            listener.local_addr()?,
            config.routes.len()
        );
        Ok(Self {
            routes: Arc::new(config.routes.clone()),
            listener,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, PeerError> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn run(self) -> Result<(), PeerError> {
        self.run_until(std::future::pending()).await
    }

    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), PeerError> {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => return Ok(()),
                accepted = self.listener.accept() => {
                    let (stream, addr) = accepted?;
                    let routes = self.routes.clone();
                    tokio::spawn(async move {
                        if let Err(e) = route(routes, stream).await {
                            tracing::warn!("proxied connection from {addr} failed: {e}");
                        }
                    });
                }
            }
        }
    }
}

async fn reject(client: &mut TcpStream, kind: RemoteFault, message: String) -> Result<(), PeerError> {
    tracing::warn!("proxy: {message}");
    codec::write_frame(client, &Response::Error { kind, message }, &[]).await?;
    Ok(())
}

async fn route(routes: Arc<BTreeMap<String, String>>, mut client: TcpStream) -> Result<(), PeerError> {
    let Some(hello) = codec::read_frame(&mut client).await? else {
        return Ok(());
    };
    let key = match hello.decode::<Request>() {
        Ok(Request::Hello { key: Some(key), .. }) => key,
        Ok(Request::Hello { key: None, .. }) => {
            return reject(&mut client, RemoteFault::Unauthorized, "hello without routing key".into()).await
        }
        _ => {
            return reject(&mut client, RemoteFault::InvalidRequest, "expected hello".into()).await
        }
    };
    let Some(upstream_addr) = routes.get(&key) else {
        return reject(&mut client, RemoteFault::Unauthorized, format!("no route for key '{key}'")).await;
    };

    let mut upstream = match TcpStream::connect(upstream_addr).await {
        Ok(s) => s,
        Err(e) => {
            return reject(
                &mut client,
                RemoteFault::Unreachable,
                format!("upstream {upstream_addr} unreachable: {e}"),
            )
            .await
        }
    };
    upstream.set_nodelay(true)?;
    client.set_nodelay(true)?;

    // The peer sees the original hello, key included.
    tokio::io::AsyncWriteExt::write_all(&mut upstream, &hello.to_bytes()).await?;
    tracing::info!("proxy: key '{key}' → {upstream_addr}");
    let (up, down) = tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    tracing::debug!("proxy: key '{key}' closed ({up} bytes up, {down} bytes down)");
    Ok(())
}
