// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and the pieces they share.

pub mod build;
pub mod deploy;
pub mod inspect;
pub mod proxy;
pub mod run;
pub mod serve;

use runtime::OffloadConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Which subfunction of which module, compiled for what.
#[derive(clap::Args, Debug, Clone)]
pub struct Selection {
    /// Partitioned module manifest (JSON).
    #[arg(short, long)]
    pub module: PathBuf,

    /// Name of the tagged subfunction.
    #[arg(short, long)]
    pub symbol: Option<String>,

    /// Backend tag [config default: "remote"].
    #[arg(long)]
    pub tag: Option<String>,

    /// Compilation target, e.g. "llvm" or "cuda -device=0" [config default: "llvm"].
    #[arg(long)]
    pub target: Option<String>,
}

impl Selection {
    /// Overrides the matching fields of `config`.
    pub fn apply(&self, config: &mut OffloadConfig) {
        if let Some(symbol) = &self.symbol {
            config.symbol = Some(symbol.clone());
        }
        if let Some(tag) = &self.tag {
            config.tag = tag.clone();
        }
        if let Some(target) = &self.target {
            config.target = target.clone();
        }
    }
}

/// Reads the offload config, or the defaults without one.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<OffloadConfig> {
    Ok(match path {
        Some(path) => OffloadConfig::from_file(path)?,
        None => OffloadConfig::default(),
    })
}

pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║ {:^52} ║", format!("offload-rt · {title}"));
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}
