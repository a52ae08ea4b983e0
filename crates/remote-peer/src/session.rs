// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-connection request dispatch.

use crate::{materialize, GraphExecutor, PeerConfig, PeerError, Sandbox};
use artifact_builder::DeviceKind;
use remote_session::protocol::{self, procedures, Request, Response};
use remote_session::{ContextId, ModuleInfo, RpcValue};
use std::collections::HashMap;
use std::sync::Arc;

/// State shared by every connection to one peer.
#[derive(Debug)]
pub struct PeerState {
    name: String,
    key: Option<String>,
    sandbox: Sandbox,
    devices: Vec<(DeviceKind, u32)>,
}

impl PeerState {
    pub fn new(config: &PeerConfig) -> Result<Arc<Self>, PeerError> {
        let devices = config.device_inventory()?;
        let sandbox = Sandbox::new(&config.sandbox)?;
        tracing::info!(
            "peer '{}': sandbox {}, devices {:?}",
            config.name,
            sandbox.root().display(),
            devices
        );
        Ok(Arc::new(Self {
            name: config.name.clone(),
            key: config.key.clone(),
            sandbox,
            devices,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// `true` if the inventory has device `index` of `kind`.
    pub fn has_device(&self, ctx: ContextId) -> bool {
        self.devices
            .iter()
            .any(|&(kind, count)| kind == ctx.device && ctx.index < count)
    }
}

/// What the connection should do after a request.
#[derive(Debug)]
pub enum Outcome {
    /// Send this response and keep going.
    Reply(Response, Vec<u8>),
    /// Send this response, then drop the connection.
    ReplyAndClose(Response, Vec<u8>),
    /// Drop the connection without replying.
    Close,
}

/// One client connection: handshake state, active context and the modules
/// it has materialized.
pub struct PeerSession {
    state: Arc<PeerState>,
    greeted: bool,
    context: Option<ContextId>,
    modules: HashMap<u64, GraphExecutor>,
    next_module: u64,
}

impl PeerSession {
    pub fn new(state: Arc<PeerState>) -> Self {
        Self {
            state,
            greeted: false,
            context: None,
            modules: HashMap::new(),
            next_module: 1,
        }
    }

    /// Context negotiated through `session.context`, if any.
    pub fn context(&self) -> Option<ContextId> {
        self.context
    }

    pub fn num_modules(&self) -> usize {
        self.modules.len()
    }

    pub fn dispatch(&mut self, request: Request, payload: Vec<u8>) -> Outcome {
        match request {
            Request::Hello { key, client } => self.hello(key, &client),
            Request::Bye => Outcome::Close,
            _ if !self.greeted => Outcome::ReplyAndClose(
                error_response(&PeerError::InvalidRequest("expected hello".into())),
                Vec::new(),
            ),
            Request::Upload { path } => match self.state.sandbox.write(&path, &payload) {
                Ok(_) => Outcome::Reply(Response::Ack, Vec::new()),
                Err(e) => self.fail(e),
            },
            Request::Call {
                procedure,
                args,
                tensors,
            } => {
                let result = protocol::unpack_tensors(&tensors, &payload)
                    .map_err(PeerError::from)
                    .and_then(|inputs| self.call(&procedure, &args, inputs));
                match result {
                    Ok((value, outputs)) => {
                        let (metas, payload) = protocol::pack_tensors(&outputs);
                        Outcome::Reply(
                            Response::Value {
                                value,
                                tensors: metas,
                            },
                            payload,
                        )
                    }
                    Err(e) => self.fail(e),
                }
            }
        }
    }

    fn hello(&mut self, key: Option<String>, client: &str) -> Outcome {
        if self.greeted {
            return self.fail(PeerError::InvalidRequest("duplicate hello".into()));
        }
        if let Some(required) = &self.state.key {
            if key.as_deref() != Some(required.as_str()) {
                tracing::warn!("rejecting client '{client}': wrong routing key");
                return Outcome::ReplyAndClose(error_response(&PeerError::Unauthorized), Vec::new());
            }
        }
        self.greeted = true;
        tracing::info!("client '{client}' connected");
        Outcome::Reply(
            Response::Welcome {
                peer: self.state.name.clone(),
            },
            Vec::new(),
        )
    }

    fn fail(&self, err: PeerError) -> Outcome {
        tracing::warn!("request failed: {err}");
        Outcome::Reply(error_response(&err), Vec::new())
    }

    fn call(
        &mut self,
        procedure: &str,
        args: &[RpcValue],
        inputs: Vec<tensor_core::Tensor>,
    ) -> Result<(RpcValue, Vec<tensor_core::Tensor>), PeerError> {
        tracing::debug!("call {procedure} ({} args, {} tensors)", args.len(), inputs.len());
        match procedure {
            procedures::SESSION_CONTEXT => {
                let device = str_arg(args, 0)?;
                let index = int_arg(args, 1)?;
                let kind = DeviceKind::parse(device)
                    .ok_or_else(|| PeerError::DeviceUnavailable(format!("unknown device '{device}'")))?;
                let index = u32::try_from(index)
                    .map_err(|_| PeerError::DeviceUnavailable(format!("bad device index {index}")))?;
                let ctx = ContextId::new(kind, index);
                if !self.state.has_device(ctx) {
                    return Err(PeerError::DeviceUnavailable(ctx.to_string()));
                }
                self.context = Some(ctx);
                Ok((RpcValue::Context(ctx), Vec::new()))
            }
            procedures::MODULE_MATERIALIZE => {
                let path = str_arg(args, 0)?;
                let ctx = match args.get(1) {
                    Some(RpcValue::Context(ctx)) => *ctx,
                    _ => return Err(PeerError::InvalidRequest("argument 1 must be a context".into())),
                };
                if !self.state.has_device(ctx) {
                    return Err(PeerError::DeviceUnavailable(ctx.to_string()));
                }
                if self.context.is_some_and(|active| active != ctx) {
                    tracing::warn!("materializing on {ctx}, session context is {:?}", self.context);
                }
                let executor = materialize(&self.state.sandbox, path, ctx)?;
                let id = self.next_module;
                self.next_module += 1;
                let info = ModuleInfo {
                    id,
                    num_inputs: executor.num_inputs(),
                    num_outputs: executor.num_outputs(),
                    input_names: executor.descriptor().input_names(),
                };
                self.modules.insert(id, executor);
                Ok((RpcValue::Module(info), Vec::new()))
            }
            procedures::MODULE_RUN => {
                let id = module_arg(args)?;
                let executor = self.modules.get(&id).ok_or(PeerError::UnknownModule(id))?;
                let outputs = executor.run(&inputs)?;
                Ok((RpcValue::Null, outputs))
            }
            procedures::MODULE_FREE => {
                let id = module_arg(args)?;
                self.modules.remove(&id).ok_or(PeerError::UnknownModule(id))?;
                Ok((RpcValue::Null, Vec::new()))
            }
            other => Err(PeerError::InvalidRequest(format!("unknown procedure '{other}'"))),
        }
    }
}

impl Drop for PeerSession {
    fn drop(&mut self) {
        if !self.modules.is_empty() {
            tracing::debug!("freeing {} module(s) on disconnect", self.modules.len());
        }
    }
}

fn error_response(err: &PeerError) -> Response {
    Response::Error {
        kind: err.fault(),
        message: err.to_string(),
    }
}

fn str_arg(args: &[RpcValue], i: usize) -> Result<&str, PeerError> {
    args.get(i)
        .and_then(RpcValue::as_str)
        .ok_or_else(|| PeerError::InvalidRequest(format!("argument {i} must be a string")))
}

fn int_arg(args: &[RpcValue], i: usize) -> Result<i64, PeerError> {
    args.get(i)
        .and_then(RpcValue::as_int)
        .ok_or_else(|| PeerError::InvalidRequest(format!("argument {i} must be an integer")))
}

fn module_arg(args: &[RpcValue]) -> Result<u64, PeerError> {
    let id = int_arg(args, 0)?;
    u64::try_from(id).map_err(|_| PeerError::InvalidRequest(format!("bad module id {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use remote_session::RemoteFault;

    fn state(key: Option<&str>) -> Arc<PeerState> {
        let config = PeerConfig {
            key: key.map(str::to_string),
            sandbox: std::env::temp_dir().join(format!("peer_session_{}", std::process::id())),
            devices: vec!["cpu:2".into()],
            ..PeerConfig::default()
        };
        PeerState::new(&config).unwrap()
    }

    fn hello(key: Option<&str>) -> Request {
        Request::Hello {
            key: key.map(str::to_string),
            client: "test".into(),
        }
    }

    fn call(procedure: &str, args: Vec<RpcValue>) -> Request {
        Request::Call {
            procedure: procedure.into(),
            args,
            tensors: vec![],
        }
    }

    fn fault(outcome: Outcome) -> RemoteFault {
        match outcome {
            Outcome::Reply(Response::Error { kind, .. }, _)
            | Outcome::ReplyAndClose(Response::Error { kind, .. }, _) => kind,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_requires_hello() {
        let mut s = PeerSession::new(state(None));
        let out = s.dispatch(Request::Upload { path: "/a".into() }, vec![1]);
        assert!(matches!(out, Outcome::ReplyAndClose(Response::Error { .. }, _)));
    }

    #[test]
    fn test_key_enforced() {
        let mut s = PeerSession::new(state(Some("k")));
        assert_eq!(fault(s.dispatch(hello(Some("x")), vec![])), RemoteFault::Unauthorized);
        let mut s = PeerSession::new(state(Some("k")));
        assert!(matches!(
            s.dispatch(hello(Some("k")), vec![]),
            Outcome::Reply(Response::Welcome { .. }, _)
        ));
    }

    #[test]
    fn test_context_inventory() {
        let mut s = PeerSession::new(state(None));
        s.dispatch(hello(None), vec![]);
        let ok = s.dispatch(
            call(procedures::SESSION_CONTEXT, vec![RpcValue::Str("cpu".into()), RpcValue::Int(1)]),
            vec![],
        );
        assert!(matches!(
            ok,
            Outcome::Reply(Response::Value { value: RpcValue::Context(_), .. }, _)
        ));
        assert_eq!(s.context(), Some(ContextId::new(DeviceKind::Cpu, 1)));
        let missing = s.dispatch(
            call(procedures::SESSION_CONTEXT, vec![RpcValue::Str("cpu".into()), RpcValue::Int(2)]),
            vec![],
        );
        assert_eq!(fault(missing), RemoteFault::DeviceUnavailable);
        let cuda = s.dispatch(
            call(procedures::SESSION_CONTEXT, vec![RpcValue::Str("cuda".into()), RpcValue::Int(0)]),
            vec![],
        );
        assert_eq!(fault(cuda), RemoteFault::DeviceUnavailable);
    }

    #[test]
    fn test_unknown_procedure_and_module() {
        let mut s = PeerSession::new(state(None));
        s.dispatch(hello(None), vec![]);
        assert_eq!(
            fault(s.dispatch(call("module.explode", vec![]), vec![])),
            RemoteFault::InvalidRequest
        );
        assert_eq!(
            fault(s.dispatch(call(procedures::MODULE_FREE, vec![RpcValue::Int(9)]), vec![])),
            RemoteFault::InvalidRequest
        );
    }

    #[test]
    fn test_materialize_missing_files() {
        let mut s = PeerSession::new(state(None));
        s.dispatch(hello(None), vec![]);
        let out = s.dispatch(
            call(
                procedures::MODULE_MATERIALIZE,
                vec![RpcValue::Str("/nowhere/f".into()), RpcValue::Context(ContextId::cpu())],
            ),
            vec![],
        );
        assert_eq!(fault(out), RemoteFault::NotFound);
        assert_eq!(s.num_modules(), 0);
    }

    #[test]
    fn test_bye_closes() {
        let mut s = PeerSession::new(state(None));
        assert!(matches!(s.dispatch(Request::Bye, vec![]), Outcome::Close));
    }
}
