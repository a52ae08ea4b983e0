// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # offload-rt
//!
//! Command-line interface for the remote offload runtime.
//!
//! ## Usage
//! ```bash
//! # On the device: serve a peer
//! offload-rt serve --listen 0.0.0.0:9190 --sandbox /var/lib/offload --device cpu:1
//!
//! # Optionally, route several devices behind one address
//! offload-rt proxy --listen 0.0.0.0:9090 --route jetson=192.168.1.21:9190
//!
//! # On the host: inspect, build and deploy a tagged subfunction
//! offload-rt inspect --module ./partitioned.json
//! offload-rt build --module ./partitioned.json --symbol add1 --out ./artifacts
//! offload-rt deploy --module ./partitioned.json --symbol add1 --host 192.168.1.21 --record add1.json
//!
//! # Later: reattach to the staged module and run it
//! offload-rt run --record add1.json --input 4:0,1,2,3
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "offload-rt",
    about = "Offload tagged subgraphs to remote devices",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file. `serve` reads a peer config,
    /// `proxy` a proxy config, the other commands an offload config.
    /// Command-line flags override its values.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a peer that accepts artifacts and executes them.
    Serve(commands::serve::ServeArgs),

    /// Run a routing proxy that forwards sessions by key.
    Proxy(commands::proxy::ProxyArgs),

    /// Show the functions of a partitioned module and what each tag offloads.
    Inspect {
        /// Partitioned module manifest (JSON).
        #[arg(short, long)]
        module: PathBuf,

        /// Only show this backend tag.
        #[arg(short, long)]
        tag: Option<String>,
    },

    /// Compile one tagged subfunction and write its artifact triple.
    Build {
        #[command(flatten)]
        select: commands::Selection,

        /// Output directory for `<symbol>.bin`, `.json` and `.params`.
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },

    /// Deploy one tagged subfunction to a peer.
    Deploy(commands::deploy::DeployArgs),

    /// Reattach to a deployed module and run it once.
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Serve(args) => commands::serve::execute(cli.config, args).await,
        Commands::Proxy(args) => commands::proxy::execute(cli.config, args).await,
        Commands::Inspect { module, tag } => commands::inspect::execute(module, tag).await,
        Commands::Build { select, out } => commands::build::execute(cli.config, select, out).await,
        Commands::Deploy(args) => commands::deploy::execute(cli.config, args).await,
        Commands::Run(args) => commands::run::execute(cli.config, args).await,
    }
}
