// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Staging area for uploaded files.
//!
//! Clients address files by absolute-looking remote paths such as
//! `/tmp/offload/add1.bin`. The sandbox maps them under its own root
//! (`<root>/tmp/offload/add1.bin`) and refuses anything that would leave it.

use crate::PeerError;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Opens (and creates if needed) a sandbox rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, PeerError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a remote path to a local file under the root.
    pub fn resolve(&self, remote: &str) -> Result<PathBuf, PeerError> {
        let reject = |detail: &str| PeerError::Sandbox {
            path: remote.to_string(),
            detail: detail.to_string(),
        };
        if remote.contains('\0') {
            return Err(reject("contains NUL"));
        }
        let relative = remote.trim_start_matches('/');
        if relative.is_empty() {
            return Err(reject("empty path"));
        }
        let mut out = self.root.clone();
        for component in Path::new(relative).components() {
            match component {
                Component::Normal(part) => out.push(part),
                Component::CurDir => {}
                Component::ParentDir => return Err(reject("'..' is not allowed")),
                Component::RootDir | Component::Prefix(_) => {
                    return Err(reject("unexpected root component"))
                }
            }
        }
        if out == self.root {
            return Err(reject("path names the sandbox root"));
        }
        Ok(out)
    }

    /// Writes `bytes` to `remote`, replacing any existing file atomically.
    pub fn write(&self, remote: &str, bytes: &[u8]) -> Result<PathBuf, PeerError> {
        let path = self.resolve(remote)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(
            ".{file_name}.{}.{}.part",
            std::process::id(),
            TEMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::write(&tmp, bytes)?;
        if let Err(e) = std::fs::rename(&tmp, &path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!("staged {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// Resolves `remote` and checks that the file exists.
    pub fn existing(&self, remote: &str) -> Result<PathBuf, PeerError> {
        let path = self.resolve(remote)?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(PeerError::NotStaged(remote.to_string()))
        }
    }

    pub fn read(&self, remote: &str) -> Result<Vec<u8>, PeerError> {
        Ok(std::fs::read(self.existing(remote)?)?)
    }
}
