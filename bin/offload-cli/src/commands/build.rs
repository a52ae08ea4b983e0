// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `offload-rt build` command: compile a tagged subfunction to disk.
//!
//! The written triple can be deployed later with `deploy --artifact DIR`.

use super::Selection;
use artifact_builder::ArtifactBuilder;
use offload_ir::ModuleLoader;
use runtime::Offloader;
use std::path::PathBuf;

pub async fn execute(config: Option<PathBuf>, select: Selection, out: PathBuf) -> anyhow::Result<()> {
    super::banner("Artifact Builder");

    let mut config = super::load_config(config.as_deref())?;
    select.apply(&mut config);
    let target = config.parse_target()?;
    let module = ModuleLoader::load(&select.module)?;

    // Step 1: Idle → Resolved.
    println!("  [1/2] Resolving '{}' (tag '{}')...", config.require_symbol()?, config.tag);
    let resolved = Offloader::from_config(&config)?.resolve(&module)?;
    println!("        {}", resolved.unit().summary());
    println!();

    // Step 2: Resolved → Built.
    println!("  [2/2] Compiling for '{target}'...");
    let builder = ArtifactBuilder::default();
    let built = resolved.build(&builder, &target)?;
    std::fs::create_dir_all(&out)?;
    let written = built.artifact().save_dir(&out)?;
    println!("        {}", built.artifact().summary());
    for path in written {
        println!("        wrote {}", path.display());
    }
    Ok(())
}
