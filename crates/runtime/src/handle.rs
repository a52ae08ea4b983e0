// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`RemoteHandle`]: a materialized module on a peer.
//!
//! A handle refers to its session weakly. It stops being valid when the
//! session is closed or dropped, after a transport failure while running,
//! or once released. It never becomes valid again.

use crate::{DeployMetrics, DeployPath, DeployState, OffloadError, RemoteLoader, Stage};
use remote_session::protocol::procedures;
use remote_session::{
    ContextId, Endpoint, Invocation, ModuleInfo, RemoteSession, RpcValue, SessionManager,
    WeakSession,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tensor_core::Tensor;

/// A module materialized on a remote peer, ready to run.
pub struct RemoteHandle {
    session: WeakSession,
    session_id: u64,
    endpoint: Endpoint,
    path: DeployPath,
    context: ContextId,
    module: ModuleInfo,
    metrics: DeployMetrics,
    history: Vec<DeployState>,
    released: AtomicBool,
    runs: AtomicU64,
}

impl RemoteHandle {
    pub(crate) fn new(
        session: &RemoteSession,
        path: DeployPath,
        context: ContextId,
        module: ModuleInfo,
        metrics: DeployMetrics,
        history: Vec<DeployState>,
    ) -> Self {
        Self {
            session: session.downgrade(),
            session_id: session.id(),
            endpoint: session.endpoint().clone(),
            path,
            context,
            module,
            metrics,
            history,
            released: AtomicBool::new(false),
            runs: AtomicU64::new(0),
        }
    }

    /// `true` while the owning session is open and the module has not been
    /// released.
    pub fn is_valid(&self) -> bool {
        !self.released.load(Ordering::Acquire) && self.session.is_alive()
    }

    pub fn symbol(&self) -> &str {
        self.path.symbol()
    }

    pub fn deploy_path(&self) -> &DeployPath {
        &self.path
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Id of the session the module was materialized on.
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Peer-side module number, unique within its session.
    pub fn module_id(&self) -> u64 {
        self.module.id
    }

    pub fn input_names(&self) -> &[String] {
        &self.module.input_names
    }

    pub fn num_inputs(&self) -> usize {
        self.module.num_inputs
    }

    pub fn num_outputs(&self) -> usize {
        self.module.num_outputs
    }

    pub fn metrics(&self) -> &DeployMetrics {
        &self.metrics
    }

    /// States the deploy attempt went through, ending in `Ready`.
    pub fn history(&self) -> &[DeployState] {
        &self.history
    }

    /// Number of successful runs.
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Runs the module with `inputs` in declaration order and returns its
    /// outputs.
    pub fn run(&self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>, OffloadError> {
        let session = self.live_session()?;
        if inputs.len() != self.module.num_inputs {
            return Err(OffloadError::InvokeFailed(format!(
                "'{}' takes {} inputs, got {}",
                self.symbol(),
                self.module.num_inputs,
                inputs.len()
            )));
        }

        let call = Invocation::new(procedures::MODULE_RUN, vec![self.module_arg()])
            .with_tensors(inputs);
        let reply = session.invoke(call).map_err(|e| {
            if e.is_transport_fault() {
                tracing::warn!(
                    "transport fault while running '{}', closing session {}",
                    self.symbol(),
                    session.id()
                );
                session.close();
            }
            OffloadError::at(Stage::Run, e)
        })?;

        if reply.tensors.len() != self.module.num_outputs {
            return Err(OffloadError::InvokeFailed(format!(
                "'{}' returned {} outputs, expected {}",
                self.symbol(),
                reply.tensors.len(),
                self.module.num_outputs
            )));
        }
        self.runs.fetch_add(1, Ordering::Relaxed);
        Ok(reply.tensors)
    }

    /// Frees the peer-side module. The handle is invalid afterwards.
    pub fn release(&self) -> Result<(), OffloadError> {
        let session = self.live_session()?;
        self.released.store(true, Ordering::Release);
        session
            .invoke(Invocation::new(procedures::MODULE_FREE, vec![self.module_arg()]))
            .map_err(|e| OffloadError::at(Stage::Release, e))?;
        tracing::debug!("released '{}' (module {})", self.symbol(), self.module.id);
        Ok(())
    }

    /// Describes this handle so it can be reattached from another session.
    pub fn record(&self) -> HandleRecord {
        HandleRecord {
            endpoint: self.endpoint.clone(),
            symbol: self.symbol().to_string(),
            staging_root: self.path.root().to_string(),
            deploy_path: self.path.base(),
            context: self.context,
        }
    }

    /// Reconnects to the recorded endpoint, renegotiates the recorded
    /// context and materializes the already-staged files.
    ///
    /// Nothing is uploaded. The returned handle is new and belongs to the
    /// returned session; the caller keeps the session alive.
    pub fn reattach(
        manager: &SessionManager,
        record: &HandleRecord,
    ) -> Result<(RemoteSession, RemoteHandle), OffloadError> {
        let loader = RemoteLoader::new(record.staging_root.clone());
        let expected = loader.deploy_path(&record.symbol).base();
        if expected != record.deploy_path {
            return Err(OffloadError::Config(format!(
                "record deploy path '{}' does not match '{expected}'",
                record.deploy_path
            )));
        }

        let session = manager
            .connect_endpoint(&record.endpoint)
            .map_err(|e| OffloadError::at(Stage::Connect, e))?;
        session
            .context_for(record.context)
            .map_err(|e| OffloadError::at(Stage::Context, e))?;
        let handle = loader.materialize_existing(&session, &record.symbol)?;
        tracing::info!("reattached '{}' on session {}", record.symbol, session.id());
        Ok((session, handle))
    }

    fn live_session(&self) -> Result<RemoteSession, OffloadError> {
        if self.released.load(Ordering::Acquire) {
            return Err(OffloadError::HandleInvalid);
        }
        self.session.upgrade().ok_or(OffloadError::HandleInvalid)
    }

    fn module_arg(&self) -> RpcValue {
        RpcValue::Int(self.module.id as i64)
    }
}

impl std::fmt::Debug for RemoteHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("symbol", &self.symbol())
            .field("endpoint", &self.endpoint.to_string())
            .field("session", &self.session_id)
            .field("module", &self.module.id)
            .field("context", &self.context)
            .field("valid", &self.is_valid())
            .finish()
    }
}

// ── Records ────────────────────────────────────────────────────

/// Serialisable description of a [`RemoteHandle`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HandleRecord {
    pub endpoint: Endpoint,
    pub symbol: String,
    pub staging_root: String,
    pub deploy_path: String,
    pub context: ContextId,
}

impl HandleRecord {
    pub fn to_json(&self) -> Result<String, OffloadError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OffloadError::Config(format!("cannot encode handle record: {e}")))
    }

    pub fn from_json(json: &str) -> Result<Self, OffloadError> {
        serde_json::from_str(json)
            .map_err(|e| OffloadError::Config(format!("invalid handle record: {e}")))
    }

    pub fn save(&self, path: &Path) -> Result<(), OffloadError> {
        std::fs::write(path, self.to_json()?).map_err(|e| {
            OffloadError::Config(format!("cannot write record '{}': {e}", path.display()))
        })
    }

    pub fn load(path: &Path) -> Result<Self, OffloadError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            OffloadError::Config(format!("cannot read record '{}': {e}", path.display()))
        })?;
        Self::from_json(&json)
    }
}
