// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Client side of the remote offload protocol.
//!
//! The runtime takes:
//! - A validated `PartitionedModule` from `offload-ir` plus a backend tag
//!   and a symbol.
//! - An `ArtifactBuilder` from `artifact-builder` (or an artifact built
//!   earlier).
//! - A `RemoteSession` from `remote-session` with a negotiated context.
//!
//! And produces a [`RemoteHandle`]: the subfunction compiled, uploaded as
//! an artifact triple and materialized on the peer.
//!
//! # Type-State Pipeline
//! ```text
//! Offloader<Idle> → Offloader<Resolved> → Offloader<Built> → RemoteHandle
//! ```
//!
//! # Blocking I/O
//! Every network step blocks the calling thread for at most the session
//! timeout. Run independent deploys on separate threads with separate
//! sessions.

mod config;
mod error;
mod handle;
mod loader;
mod metrics;
mod offloader;

pub use config::OffloadConfig;
pub use error::{OffloadError, Stage};
pub use handle::{HandleRecord, RemoteHandle};
pub use loader::{DeployAttempt, DeployPath, DeployState, RemoteLoader};
pub use metrics::{DeployMetrics, UploadMetrics};
pub use offloader::{Built, Idle, OffloadState, Offloader, Resolved};
