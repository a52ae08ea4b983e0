// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`SessionManager`]: opens sessions and negotiates contexts.

use crate::{
    ContextId, Connector, Endpoint, RemoteSession, SessionConfig, SessionError, TcpConnector,
};
use artifact_builder::Target;
use std::time::Duration;

/// Opens [`RemoteSession`]s through a [`Connector`].
pub struct SessionManager {
    connector: Box<dyn Connector>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(connector: Box<dyn Connector>, config: SessionConfig) -> Self {
        Self { connector, config }
    }

    /// A manager using plain TCP.
    pub fn tcp(config: SessionConfig) -> Self {
        Self::new(Box::new(TcpConnector), config)
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Connects to `host:port`. With a `key`, `host:port` is taken to be a
    /// routing proxy.
    pub fn connect(&self, host: &str, port: u16, key: Option<&str>) -> Result<RemoteSession, SessionError> {
        self.connect_endpoint(&Endpoint::new(host, port, key.map(str::to_string)))
    }

    pub fn connect_endpoint(&self, endpoint: &Endpoint) -> Result<RemoteSession, SessionError> {
        if endpoint.host.is_empty() {
            return Err(SessionError::Config("endpoint host is empty".into()));
        }
        if endpoint.key.as_deref() == Some("") {
            return Err(SessionError::Config("routing key is empty".into()));
        }
        tracing::info!("connecting to {endpoint} (timeout {:?})", self.timeout());
        let transport = self
            .connector
            .connect(endpoint, &self.config.client_name, self.timeout())?;
        Ok(RemoteSession::new(endpoint.clone(), transport))
    }

    /// Negotiates an execution context for `target` on `session`.
    pub fn context(&self, session: &RemoteSession, target: &Target) -> Result<ContextId, SessionError> {
        session.context(target)
    }
}
