// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt proxy` command: route sessions to peers by key.

use remote_peer::{ProxyConfig, RoutingProxy};
use std::path::PathBuf;

#[derive(clap::Args, Debug)]
pub struct ProxyArgs {
    /// Address to listen on [config default: 0.0.0.0:9090].
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Route `key=host:port`; repeat for several peers.
    #[arg(short, long = "route", value_parser = parse_route)]
    pub routes: Vec<(String, String)>,
}

fn parse_route(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, addr)) if !key.is_empty() && !addr.is_empty() => {
            Ok((key.to_string(), addr.to_string()))
        }
        _ => Err(format!("expected key=host:port, got '{s}'")),
    }
}

pub async fn execute(config_path: Option<PathBuf>, args: ProxyArgs) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => ProxyConfig::from_file(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    config.routes.extend(args.routes);
    if config.routes.is_empty() {
        anyhow::bail!("no routes configured; pass --route key=host:port");
    }

    super::banner("Routing Proxy");
    for (key, addr) in &config.routes {
        println!("  {key:<16} → {addr}");
    }
    println!();

    let proxy = RoutingProxy::bind(&config).await?;
    println!("  Listening on {}  (Ctrl-C to stop)", proxy.local_addr()?);
    proxy
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
