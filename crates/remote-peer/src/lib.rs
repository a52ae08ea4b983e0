// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # remote-peer
//!
//! The device side of the offload protocol.
//!
//! A peer accepts sessions, stages uploaded files inside a [`Sandbox`],
//! hands out execution contexts from its device inventory, and turns a
//! staged artifact triple into a runnable [`GraphExecutor`].
//!
//! # Architecture
//!
//! ```text
//!  TcpTransport ──▶ RoutingProxy ──▶ PeerServer ──┐
//!                                                  ├──▶ PeerSession::dispatch
//!  LoopbackTransport ─────────────────────────────┘        │
//!                                                           ├─ Sandbox (uploads)
//!                                                           ├─ materialize()
//!                                                           └─ GraphExecutor::run
//! ```
//!
//! Each connection gets its own [`PeerSession`] and therefore its own
//! module table; closing the connection frees every module it loaded.
//! Staged files live in the sandbox and outlive the connection.

mod codec;
mod config;
mod error;
mod executor;
pub mod kernels;
mod loopback;
mod materialize;
mod proxy;
mod sandbox;
mod server;
mod session;

pub use config::{PeerConfig, ProxyConfig};
pub use error::PeerError;
pub use executor::GraphExecutor;
pub use loopback::{LoopbackConnector, LoopbackTransport};
pub use materialize::materialize;
pub use proxy::RoutingProxy;
pub use sandbox::Sandbox;
pub use server::PeerServer;
pub use session::{Outcome, PeerSession, PeerState};
