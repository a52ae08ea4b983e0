// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt inspect` command: display the functions of a partitioned
//! module and the units each backend tag would offload.

use offload_ir::{candidates, resolve, ModuleLoader};
use std::path::PathBuf;

pub async fn execute(module: PathBuf, tag: Option<String>) -> anyhow::Result<()> {
    super::banner("Module Inspector");

    let m = ModuleLoader::load(&module).map_err(|e| {
        anyhow::anyhow!("failed to load module from '{}': {e}", module.display())
    })?;

    // ── Summary ────────────────────────────────────────────────
    println!("  {}", m.summary());
    println!();

    // ── Functions ──────────────────────────────────────────────
    println!(
        "  {:<24} {:<12} {:>7} {:>8} {:>6}",
        "Function", "Tag", "Params", "Outputs", "Nodes",
    );
    println!("  {}", "-".repeat(61));
    for f in &m.functions {
        println!(
            "  {:<24} {:<12} {:>7} {:>8} {:>6}",
            truncate(&f.name, 24),
            f.backend_tag().unwrap_or("-"),
            f.params.len(),
            f.num_outputs(),
            f.body.node_count(),
        );
    }
    println!();

    // ── Offloadable units ──────────────────────────────────────
    let tags: Vec<String> = match tag {
        Some(t) => vec![t],
        None => m.backend_tags().into_iter().map(str::to_string).collect(),
    };
    for t in &tags {
        let symbols = candidates(&m, t);
        println!("  Tag '{t}': {} symbol(s)", symbols.len());
        for symbol in &symbols {
            match resolve(&m, t, symbol) {
                Ok(unit) => println!("   {}", unit.summary()),
                Err(e) => println!("   {symbol}: {e}"),
            }
        }
        println!();
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
