// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt deploy` command: resolve, build, upload and materialize.
//!
//! ```text
//! Offloader<Idle> → resolve → <Resolved> → build | with_artifact → <Built> → deploy
//!                                 └──────────── attach (--no-compile) ────────────┘
//! ```

use super::Selection;
use anyhow::Context;
use artifact_builder::{ArtifactBuilder, CompiledArtifact};
use offload_ir::ModuleLoader;
use remote_session::SessionManager;
use runtime::{OffloadConfig, OffloadError, Offloader, RemoteHandle, Stage};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub select: Selection,

    /// Peer or proxy host [config default: 127.0.0.1].
    #[arg(long)]
    pub host: Option<String>,

    /// Peer or proxy port [config default: 9190].
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Routing key, when connecting through a proxy.
    #[arg(short, long)]
    pub key: Option<String>,

    /// Remote staging directory [config default: "staging"].
    #[arg(long)]
    pub staging_root: Option<String>,

    /// Deploy a triple written by `build` instead of compiling.
    #[arg(short, long, conflicts_with = "no_compile")]
    pub artifact: Option<PathBuf>,

    /// Skip compiling and uploading; materialize what is already staged.
    #[arg(long)]
    pub no_compile: bool,

    /// Connect and transfer timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write a handle record here for `offload-rt run`.
    #[arg(short, long)]
    pub record: Option<PathBuf>,
}

impl DeployArgs {
    fn apply(&self, config: &mut OffloadConfig) {
        self.select.apply(config);
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.key.is_some() {
            config.key = self.key.clone();
        }
        if let Some(root) = &self.staging_root {
            config.staging_root = root.clone();
        }
        if let Some(dir) = &self.artifact {
            config.compile = false;
            config.artifact_dir = Some(dir.clone());
        }
        if self.no_compile {
            config.compile = false;
            config.artifact_dir = None;
        }
        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = ms;
        }
    }
}

pub async fn execute(config: Option<PathBuf>, args: DeployArgs) -> anyhow::Result<()> {
    super::banner("Deploy");

    let mut config = super::load_config(config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    println!("  Config:");
    println!("   Peer:     {}", config.endpoint());
    println!("   Symbol:   {} (tag '{}')", config.require_symbol()?, config.tag);
    println!("   Target:   {}", config.target);
    println!("   Staging:  {}", config.staging_root);
    println!();

    let module_path = args.select.module.clone();
    let record_path = args.record.clone();

    // The protocol is blocking; keep it off the async workers.
    let handle = tokio::task::spawn_blocking(move || deploy(&config, module_path))
        .await
        .context("deploy task panicked")??;

    println!();
    println!("  Ready: '{}' as module {}", handle.symbol(), handle.module_id());
    println!("   Deploy path: {}", handle.deploy_path());
    println!("   Context:     {}", handle.context());
    println!("   Inputs:      {:?}", handle.input_names());
    println!("   Outputs:     {}", handle.num_outputs());
    println!("   {}", handle.metrics().summary());

    if let Some(path) = record_path {
        handle.record().save(&path)?;
        println!("   Record:      {}", path.display());
    }
    Ok(())
}

fn deploy(config: &OffloadConfig, module_path: PathBuf) -> anyhow::Result<RemoteHandle> {
    let target = config.parse_target()?;
    let module = ModuleLoader::load(&module_path)?;

    println!("  [1/3] Resolving...");
    let resolved = Offloader::from_config(config)?.resolve(&module)?;
    println!("        {}", resolved.unit().summary());

    println!("  [2/3] Connecting to {}...", config.endpoint());
    let manager = SessionManager::tcp(config.session_config());
    let session = manager
        .connect_endpoint(&config.endpoint())
        .map_err(|e| OffloadError::at(Stage::Connect, e))?;
    let ctx = manager
        .context(&session, &target)
        .map_err(|e| OffloadError::at(Stage::Context, e))?;
    println!("        Session {} to '{}', context {ctx}", session.id(), session.peer_name());

    println!("  [3/3] Deploying...");
    let handle = if config.compile {
        resolved
            .build(&ArtifactBuilder::default(), &target)?
            .deploy(&session)?
    } else if let Some(dir) = &config.artifact_dir {
        let artifact = CompiledArtifact::load_dir(dir, resolved.symbol())?;
        resolved.with_artifact(artifact)?.deploy(&session)?
    } else {
        resolved.attach(&session)?
    };
    // The session closes when this function returns; the record keeps
    // what is needed to come back.
    Ok(handle)
}
