// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt run` command: reattach to a staged module and run it.

use anyhow::Context;
use remote_session::SessionManager;
use runtime::{HandleRecord, RemoteHandle};
use std::path::PathBuf;
use tensor_core::{Shape, Tensor};

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Handle record written by `deploy --record`.
    #[arg(short, long)]
    pub record: PathBuf,

    /// Input tensor `DIMS:VALUES`, e.g. `4:0,1,2,3` or `1x2:1,-3`; one per
    /// module input, in order.
    #[arg(short, long = "input", value_parser = parse_tensor)]
    pub inputs: Vec<Tensor>,
}

/// Parses `DIMS:VALUES` into an `f32` tensor.
fn parse_tensor(s: &str) -> Result<Tensor, String> {
    let (dims, values) = s
        .split_once(':')
        .ok_or_else(|| format!("expected DIMS:VALUES, got '{s}'"))?;
    let dims = if dims.is_empty() {
        Vec::new()
    } else {
        dims.split('x')
            .map(|d| d.trim().parse::<usize>().map_err(|e| format!("bad dim '{d}': {e}")))
            .collect::<Result<Vec<_>, _>>()?
    };
    let values = values
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("bad value '{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    Tensor::from_f32(Shape::new(dims), &values).map_err(|e| e.to_string())
}

pub async fn execute(config: Option<PathBuf>, args: RunArgs) -> anyhow::Result<()> {
    super::banner("Remote Run");

    let config = super::load_config(config.as_deref())?;
    let record = HandleRecord::load(&args.record)?;
    println!("  Peer:     {}", record.endpoint);
    println!("  Symbol:   {}", record.symbol);
    println!("  Path:     {}", record.deploy_path);
    println!("  Context:  {}", record.context);
    println!();

    let manager = SessionManager::tcp(config.session_config());
    let outputs = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<Tensor>> {
        let (_session, handle) = RemoteHandle::reattach(&manager, &record)?;
        println!("  Reattached as module {} ({:?})", handle.module_id(), handle.input_names());
        let outputs = handle.run(args.inputs)?;
        handle.release()?;
        Ok(outputs)
    })
    .await
    .context("run task panicked")??;

    println!();
    for (i, out) in outputs.iter().enumerate() {
        println!("  Output {i}: shape {}  {:?}", out.shape(), out.to_f32_vec()?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tensor() {
        let t = parse_tensor("1x2:1,-3").unwrap();
        assert_eq!(t.shape(), &Shape::new(vec![1, 2]));
        assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, -3.0]);

        let s = parse_tensor(":2.5").unwrap();
        assert_eq!(s.shape(), &Shape::new(vec![]));
    }

    #[test]
    fn test_parse_tensor_errors() {
        assert!(parse_tensor("4").is_err());
        assert!(parse_tensor("4:1,2").is_err());
        assert!(parse_tensor("ax2:1").is_err());
    }
}
