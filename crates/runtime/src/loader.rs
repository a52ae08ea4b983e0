// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`RemoteLoader`]: uploads an artifact triple and materializes it.
//!
//! ```text
//! Resolved ─► Built ─► Uploading(binary) ─► Uploading(descriptor)
//!    │                       ─► Uploading(parameters) ─► Materializing ─► Ready
//!    └──────────────────────────────────────────────────┘
//!                 (already staged: no upload)
//! ```
//!
//! Any state may move to `Failed`. `Ready` and `Failed` are terminal.

use crate::{DeployMetrics, OffloadError, RemoteHandle, Stage};
use artifact_builder::{ArtifactPart, CompiledArtifact};
use offload_ir::is_identifier;
use remote_session::protocol::procedures;
use remote_session::{ContextId, Invocation, ModuleInfo, RemoteSession, RpcValue};
use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

// ── Deploy path ────────────────────────────────────────────────

/// Where a symbol's artifact triple lives on the peer.
///
/// `<staging_root>/<symbol>`; each part appends its extension.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DeployPath {
    root: String,
    symbol: String,
}

impl DeployPath {
    pub fn new(root: &str, symbol: &str) -> Self {
        Self {
            root: root.trim_end_matches('/').to_string(),
            symbol: symbol.to_string(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Path without extension, as passed to the materialize call.
    pub fn base(&self) -> String {
        if self.root.is_empty() {
            self.symbol.clone()
        } else {
            format!("{}/{}", self.root, self.symbol)
        }
    }

    /// Remote path of one part.
    pub fn file(&self, part: ArtifactPart) -> String {
        format!("{}.{}", self.base(), part.extension())
    }
}

impl fmt::Display for DeployPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base())
    }
}

// ── Deploy state machine ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Resolved,
    Built,
    Uploading(ArtifactPart),
    Materializing,
    Ready,
    /// The attempt failed during the given stage.
    Failed(Stage),
}

impl DeployState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed(_))
    }

    /// Whether `self -> next` is a legal transition.
    pub fn allows(self, next: DeployState) -> bool {
        use ArtifactPart::{Binary, Descriptor, Parameters};
        use DeployState::*;
        match (self, next) {
            (Ready | Failed(_), _) => false,
            (_, Failed(_)) => true,
            (Resolved, Built) | (Resolved, Materializing) => true,
            (Built, Uploading(Binary)) => true,
            (Uploading(Binary), Uploading(Descriptor)) => true,
            (Uploading(Descriptor), Uploading(Parameters)) => true,
            (Uploading(Parameters), Materializing) => true,
            (Materializing, Ready) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DeployState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved => f.write_str("resolved"),
            Self::Built => f.write_str("built"),
            Self::Uploading(part) => write!(f, "uploading({part})"),
            Self::Materializing => f.write_str("materializing"),
            Self::Ready => f.write_str("ready"),
            Self::Failed(stage) => write!(f, "failed({stage})"),
        }
    }
}

/// One deploy attempt and the states it went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployAttempt {
    symbol: String,
    history: Vec<DeployState>,
}

impl DeployAttempt {
    /// Starts an attempt for a resolved symbol.
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            history: vec![DeployState::Resolved],
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn state(&self) -> DeployState {
        self.history
            .last()
            .copied()
            .unwrap_or(DeployState::Resolved)
    }

    /// Every state entered so far, oldest first.
    pub fn history(&self) -> &[DeployState] {
        &self.history
    }

    pub fn advance(&mut self, next: DeployState) -> Result<(), OffloadError> {
        let from = self.state();
        if !from.allows(next) {
            return Err(OffloadError::InvalidTransition { from, to: next });
        }
        tracing::debug!("deploy '{}': {from} -> {next}", self.symbol);
        self.history.push(next);
        Ok(())
    }

    /// Marks the attempt failed, unless it already finished.
    pub fn fail(&mut self, stage: Stage) {
        if !self.state().is_terminal() {
            self.history.push(DeployState::Failed(stage));
        }
    }
}

// ── Loader ─────────────────────────────────────────────────────

/// Deploys compiled artifacts to a peer under a fixed staging root.
///
/// A loader holds no connection. Attempts through one loader are
/// independent; deploying the same symbol to the same peer concurrently
/// is the caller's race to avoid.
#[derive(Debug)]
pub struct RemoteLoader {
    staging_root: String,
    last_attempt: Mutex<Option<DeployAttempt>>,
}

impl RemoteLoader {
    pub fn new(staging_root: impl Into<String>) -> Self {
        Self {
            staging_root: staging_root.into(),
            last_attempt: Mutex::new(None),
        }
    }

    pub fn staging_root(&self) -> &str {
        &self.staging_root
    }

    pub fn deploy_path(&self, symbol: &str) -> DeployPath {
        DeployPath::new(&self.staging_root, symbol)
    }

    /// The most recent attempt made through this loader, finished or not.
    pub fn last_attempt(&self) -> Option<DeployAttempt> {
        self.last_attempt.lock().ok().and_then(|a| a.clone())
    }

    /// Uploads `artifact` as `symbol` and materializes it in the session's
    /// active context.
    ///
    /// Parts go out in the order binary, descriptor, parameters. If any of
    /// them fails, no materialize call is made.
    pub fn deploy(
        &self,
        session: &RemoteSession,
        symbol: &str,
        artifact: &CompiledArtifact,
    ) -> Result<RemoteHandle, OffloadError> {
        self.deploy_with(session, symbol, artifact, DeployMetrics::new())
    }

    /// Materializes files already staged for `symbol`, without uploading.
    pub fn materialize_existing(
        &self,
        session: &RemoteSession,
        symbol: &str,
    ) -> Result<RemoteHandle, OffloadError> {
        self.materialize_existing_with(session, symbol, DeployMetrics::new())
    }

    pub(crate) fn deploy_with(
        &self,
        session: &RemoteSession,
        symbol: &str,
        artifact: &CompiledArtifact,
        metrics: DeployMetrics,
    ) -> Result<RemoteHandle, OffloadError> {
        check_symbol(symbol)?;
        if artifact.symbol() != symbol {
            tracing::warn!(
                "deploying artifact built for '{}' as '{symbol}'",
                artifact.symbol()
            );
        }
        let mut attempt = DeployAttempt::new(symbol);
        let result = self.run_upload(&mut attempt, session, artifact, metrics);
        self.finish(attempt, session, result)
    }

    pub(crate) fn materialize_existing_with(
        &self,
        session: &RemoteSession,
        symbol: &str,
        metrics: DeployMetrics,
    ) -> Result<RemoteHandle, OffloadError> {
        check_symbol(symbol)?;
        let mut attempt = DeployAttempt::new(symbol);
        let result = self.run_materialize(&mut attempt, session, Instant::now(), metrics);
        self.finish(attempt, session, result)
    }

    fn run_upload(
        &self,
        attempt: &mut DeployAttempt,
        session: &RemoteSession,
        artifact: &CompiledArtifact,
        mut metrics: DeployMetrics,
    ) -> Result<RemoteHandle, OffloadError> {
        attempt.advance(DeployState::Built)?;
        let context = active_context(session)?;
        let path = self.deploy_path(attempt.symbol());
        let start = Instant::now();

        tracing::info!(
            "deploying '{}' ({} bytes) to {} at {path} on {context}",
            attempt.symbol(),
            artifact.total_bytes(),
            session.endpoint()
        );

        for (part, bytes) in artifact.parts() {
            attempt.advance(DeployState::Uploading(part))?;
            let remote = path.file(part);
            let t = Instant::now();
            session
                .upload(&remote, bytes)
                .map_err(|e| self.abort(session, Stage::Upload(part), e))?;
            tracing::debug!("uploaded {part} -> {remote} ({} bytes)", bytes.len());
            metrics.record_upload(part, bytes.len(), t.elapsed());
        }

        self.run_materialize(attempt, session, start, metrics)
    }

    fn run_materialize(
        &self,
        attempt: &mut DeployAttempt,
        session: &RemoteSession,
        start: Instant,
        mut metrics: DeployMetrics,
    ) -> Result<RemoteHandle, OffloadError> {
        let context = active_context(session)?;
        let path = self.deploy_path(attempt.symbol());
        attempt.advance(DeployState::Materializing)?;

        let t = Instant::now();
        let module = materialize(session, &path, context)
            .map_err(|e| self.abort(session, Stage::Materialize, e))?;
        let module = module?;
        attempt.advance(DeployState::Ready)?;
        metrics.finalise(t.elapsed(), start.elapsed());

        tracing::info!(
            "'{}' ready as module {} on {context} ({} inputs, {} outputs)",
            attempt.symbol(),
            module.id,
            module.num_inputs,
            module.num_outputs
        );
        Ok(RemoteHandle::new(
            session,
            path,
            context,
            module,
            metrics,
            attempt.history().to_vec(),
        ))
    }

    /// Records the outcome of an attempt.
    fn finish(
        &self,
        mut attempt: DeployAttempt,
        session: &RemoteSession,
        result: Result<RemoteHandle, OffloadError>,
    ) -> Result<RemoteHandle, OffloadError> {
        if let Err(e) = &result {
            let stage = e.stage().unwrap_or(Stage::Materialize);
            attempt.fail(stage);
            tracing::warn!(
                "deploy of '{}' on session {} failed: {e}",
                attempt.symbol(),
                session.id()
            );
        }
        if let Ok(mut last) = self.last_attempt.lock() {
            *last = Some(attempt);
        }
        result
    }

    /// Folds a session error, closing the session when the link is in an
    /// unknown state.
    fn abort(
        &self,
        session: &RemoteSession,
        stage: Stage,
        err: remote_session::SessionError,
    ) -> OffloadError {
        if err.is_transport_fault() {
            tracing::warn!("transport fault during {stage}, closing session {}", session.id());
            session.close();
        }
        OffloadError::at(stage, err)
    }
}

fn check_symbol(symbol: &str) -> Result<(), OffloadError> {
    if is_identifier(symbol) {
        Ok(())
    } else {
        Err(OffloadError::InvalidQuery(format!("invalid symbol '{symbol}'")))
    }
}

fn active_context(session: &RemoteSession) -> Result<ContextId, OffloadError> {
    session.active_context().ok_or_else(|| {
        OffloadError::ContextUnavailable(format!(
            "no execution context negotiated on session {}",
            session.id()
        ))
    })
}

/// Sends the materialize call. The outer error is the session's, the inner
/// one a malformed reply.
fn materialize(
    session: &RemoteSession,
    path: &DeployPath,
    context: ContextId,
) -> Result<Result<ModuleInfo, OffloadError>, remote_session::SessionError> {
    let reply = session.invoke(Invocation::new(
        procedures::MODULE_MATERIALIZE,
        vec![RpcValue::Str(path.base()), RpcValue::Context(context)],
    ))?;
    Ok(match reply.value {
        RpcValue::Module(info) => Ok(info),
        other => Err(OffloadError::LoadFailed(format!(
            "peer answered materialize with {other:?}"
        ))),
    })
}
