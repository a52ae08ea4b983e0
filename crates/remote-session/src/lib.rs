// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # remote-session
//!
//! Session-oriented connections to a remote offload peer.
//!
//! - [`SessionManager`] — connects to an [`Endpoint`] through a pluggable
//!   [`Connector`] and negotiates execution contexts.
//! - [`RemoteSession`] — a shared, internally serialised connection with an
//!   active [`ContextId`].
//! - [`Transport`] — the three primitive operations a session needs:
//!   upload a file, invoke a procedure, shut down.
//! - [`protocol`] — the framed wire format spoken over TCP.
//!
//! The client is blocking: every network operation waits at most
//! [`SessionConfig::timeout`].
//!
//! # Example
//! ```no_run
//! use artifact_builder::Target;
//! use remote_session::{SessionConfig, SessionManager};
//!
//! let manager = SessionManager::tcp(SessionConfig::default());
//! let session = manager.connect("10.0.0.7", 9190, None).unwrap();
//! let ctx = session.context(&Target::llvm()).unwrap();
//! println!("negotiated {ctx}");
//! ```

mod config;
mod context;
mod error;
mod manager;
pub mod protocol;
mod session;
mod tcp;
mod transport;

pub use config::SessionConfig;
pub use context::{ContextId, Endpoint};
pub use error::{RemoteFault, SessionError};
pub use manager::SessionManager;
pub use protocol::{ModuleInfo, RpcValue};
pub use session::{RemoteSession, WeakSession};
pub use tcp::{TcpConnector, TcpTransport};
pub use transport::{Connector, Invocation, Reply, Transport};
