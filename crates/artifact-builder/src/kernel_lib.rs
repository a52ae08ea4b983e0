// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel library: the `binary` part emitted by [`crate::GraphCompiler`].
//!
//! # Layout (all integers big-endian)
//!
//! ```text
//! "OFKL" | u16 version | u16 len | target | u64 build_id | u32 count
//!        | count × (u16 len | kernel name | u8 op code)
//! ```
//!
//! The peer checks the target's device against its execution context and
//! resolves every descriptor kernel through the export table.

use crate::LibraryError;
use offload_ir::OpKind;

pub const MAGIC: &[u8; 4] = b"OFKL";
pub const VERSION: u16 = 1;

/// One exported kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelExport {
    pub name: String,
    pub op: OpKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelLibrary {
    pub target: String,
    /// Differs between builds; the rest of the library is deterministic.
    pub build_id: u64,
    pub exports: Vec<KernelExport>,
}

fn op_code(op: OpKind) -> u8 {
    match op {
        OpKind::Add => 1,
        OpKind::Subtract => 2,
        OpKind::Multiply => 3,
        OpKind::Divide => 4,
        OpKind::Maximum => 5,
        OpKind::Negate => 6,
        OpKind::Relu => 7,
        OpKind::Matmul => 8,
    }
}

fn op_from_code(code: u8) -> Result<OpKind, LibraryError> {
    Ok(match code {
        1 => OpKind::Add,
        2 => OpKind::Subtract,
        3 => OpKind::Multiply,
        4 => OpKind::Divide,
        5 => OpKind::Maximum,
        6 => OpKind::Negate,
        7 => OpKind::Relu,
        8 => OpKind::Matmul,
        other => return Err(LibraryError::UnknownOp(other)),
    })
}

impl KernelLibrary {
    /// Looks up an exported kernel.
    pub fn lookup(&self, name: &str) -> Option<OpKind> {
        self.exports.iter().find(|e| e.name == name).map(|e| e.op)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.exports.len() * 16);
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&VERSION.to_be_bytes());
        put_str(&mut out, &self.target);
        out.extend_from_slice(&self.build_id.to_be_bytes());
        out.extend_from_slice(&(self.exports.len() as u32).to_be_bytes());
        for e in &self.exports {
            put_str(&mut out, &e.name);
            out.push(op_code(e.op));
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LibraryError> {
        let mut r = Reader { bytes, pos: 0 };
        if r.take(4)? != MAGIC {
            return Err(LibraryError::BadMagic);
        }
        let version = u16::from_be_bytes(r.array()?);
        if version != VERSION {
            return Err(LibraryError::UnsupportedVersion(version));
        }
        let target = r.string()?;
        let build_id = u64::from_be_bytes(r.array()?);
        let count = u32::from_be_bytes(r.array()?) as usize;
        let mut exports = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            let name = r.string()?;
            let [code] = r.array()?;
            exports.push(KernelExport {
                name,
                op: op_from_code(code)?,
            });
        }
        Ok(Self {
            target,
            build_id,
            exports,
        })
    }
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    let len = s.len().min(u16::MAX as usize);
    out.extend_from_slice(&(len as u16).to_be_bytes());
    out.extend_from_slice(&s.as_bytes()[..len]);
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], LibraryError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&e| e <= self.bytes.len())
            .ok_or(LibraryError::Truncated(self.pos))?;
        let s = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(s)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], LibraryError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn string(&mut self) -> Result<String, LibraryError> {
        let len = u16::from_be_bytes(self.array()?) as usize;
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec()).map_err(|_| LibraryError::InvalidUtf8)
    }
}
