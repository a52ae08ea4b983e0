// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt serve` command: run a peer.

use remote_peer::{PeerConfig, PeerServer};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Address to listen on [config default: 0.0.0.0:9190].
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Staging directory for uploaded artifacts.
    #[arg(long)]
    pub sandbox: Option<PathBuf>,

    /// Require clients to present this key.
    #[arg(short, long)]
    pub key: Option<String>,

    /// Device inventory entry `kind:count`; repeat for several kinds.
    #[arg(short, long = "device")]
    pub devices: Vec<String>,

    /// Name announced to clients.
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn execute(config_path: Option<PathBuf>, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => PeerConfig::from_file(path)?,
        None => PeerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if let Some(sandbox) = args.sandbox {
        config.sandbox = sandbox;
    }
    if args.key.is_some() {
        config.key = args.key;
    }
    if !args.devices.is_empty() {
        config.devices = args.devices;
    }
    if let Some(name) = args.name {
        config.name = name;
    }

    banner_for(&config)?;
    let server = PeerServer::bind(&config).await?;
    println!("  Listening on {}  (Ctrl-C to stop)", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("cannot listen for Ctrl-C: {e}");
                std::future::pending::<()>().await;
            }
        })
        .await?;
    println!("  Stopped.");
    Ok(())
}

fn banner_for(config: &PeerConfig) -> anyhow::Result<()> {
    super::banner("Peer");
    println!("  Name:     {}", config.name);
    println!("  Sandbox:  {}", config.sandbox.display());
    println!("  Key:      {}", if config.key.is_some() { "required" } else { "none" });
    let devices: Vec<String> = config
        .device_inventory()?
        .iter()
        .map(|(kind, count)| format!("{kind}×{count}"))
        .collect();
    println!("  Devices:  {}", devices.join(", "));
    println!();
    Ok(())
}
