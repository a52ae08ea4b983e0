// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph descriptor: the `descriptor` part of an artifact.
//!
//! A flat, topologically ordered node list. Inputs come first, then
//! parameters, then kernels; every kernel only references earlier nodes.
//!
//! ```json
//! {
//!   "symbol": "add1",
//!   "target": "llvm",
//!   "nodes": [
//!     { "name": "x", "kind": "input", "shape": [4], "dtype": "f32" },
//!     { "name": "one", "kind": "param", "shape": [], "dtype": "f32" },
//!     { "name": "add1_add_0", "kind": "kernel", "kernel": "add1_add", "op": "add",
//!       "inputs": [0, 1], "shape": [4], "dtype": "f32" }
//!   ],
//!   "arg_nodes": [0],
//!   "heads": [2]
//! }
//! ```

use offload_ir::OpKind;
use tensor_core::{DType, Shape};

/// What a node computes.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Caller-supplied input.
    Input,
    /// Named tensor from the parameter blob.
    Param,
    /// A kernel from the binary's export table.
    Kernel { kernel: String, op: OpKind },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<usize>,
    pub shape: Shape,
    pub dtype: DType,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDescriptor {
    pub symbol: String,
    pub target: String,
    pub nodes: Vec<Node>,
    /// Indices of `Input` nodes, in call-argument order.
    pub arg_nodes: Vec<usize>,
    /// Indices of output nodes, in output order.
    pub heads: Vec<usize>,
}

impl GraphDescriptor {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn num_inputs(&self) -> usize {
        self.arg_nodes.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.heads.len()
    }

    pub fn input_names(&self) -> Vec<String> {
        self.arg_nodes
            .iter()
            .filter_map(|&i| self.nodes.get(i))
            .map(|n| n.name.clone())
            .collect()
    }

    /// Names of `Param` nodes, which must all be present in the blob.
    pub fn param_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Param)
            .map(|n| n.name.as_str())
            .collect()
    }

    /// Distinct kernel names referenced by the graph.
    pub fn kernel_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .nodes
            .iter()
            .filter_map(|n| match &n.kind {
                NodeKind::Kernel { kernel, .. } => Some(kernel.as_str()),
                _ => None,
            })
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Checks structural well-formedness. Returns a description of the first
    /// problem found.
    pub fn check(&self) -> Result<(), String> {
        for (i, node) in self.nodes.iter().enumerate() {
            match &node.kind {
                NodeKind::Input | NodeKind::Param if !node.inputs.is_empty() => {
                    return Err(format!("node {i} ('{}') must not have inputs", node.name));
                }
                NodeKind::Kernel { op, .. } if node.inputs.len() != op.arity() => {
                    return Err(format!(
                        "node {i} ('{}'): '{op}' takes {} input(s), got {}",
                        node.name,
                        op.arity(),
                        node.inputs.len()
                    ));
                }
                _ => {}
            }
            if let Some(&bad) = node.inputs.iter().find(|&&j| j >= i) {
                return Err(format!(
                    "node {i} ('{}') references node {bad} which is not earlier",
                    node.name
                ));
            }
        }
        for &a in &self.arg_nodes {
            match self.nodes.get(a) {
                Some(n) if n.kind == NodeKind::Input => {}
                _ => return Err(format!("arg node {a} is not an input")),
            }
        }
        if self.heads.is_empty() {
            return Err("graph has no outputs".into());
        }
        if let Some(&h) = self.heads.iter().find(|&&h| h >= self.nodes.len()) {
            return Err(format!("head {h} out of range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GraphDescriptor {
        GraphDescriptor {
            symbol: "add1".into(),
            target: "llvm".into(),
            nodes: vec![
                Node {
                    name: "x".into(),
                    kind: NodeKind::Input,
                    inputs: vec![],
                    shape: Shape::vector(4),
                    dtype: DType::F32,
                },
                Node {
                    name: "one".into(),
                    kind: NodeKind::Param,
                    inputs: vec![],
                    shape: Shape::scalar(),
                    dtype: DType::F32,
                },
                Node {
                    name: "add1_add_0".into(),
                    kind: NodeKind::Kernel {
                        kernel: "add1_add".into(),
                        op: OpKind::Add,
                    },
                    inputs: vec![0, 1],
                    shape: Shape::vector(4),
                    dtype: DType::F32,
                },
            ],
            arg_nodes: vec![0],
            heads: vec![2],
        }
    }

    #[test]
    fn test_json_layout() {
        let d = sample();
        let json: serde_json::Value = serde_json::from_slice(&d.to_json().unwrap()).unwrap();
        assert_eq!(json["nodes"][0]["kind"], "input");
        assert_eq!(json["nodes"][2]["kernel"], "add1_add");
        assert_eq!(json["nodes"][2]["op"], "add");
        assert_eq!(GraphDescriptor::from_json(&d.to_json().unwrap()).unwrap(), d);
    }

    #[test]
    fn test_accessors() {
        let d = sample();
        assert_eq!(d.input_names(), vec!["x".to_string()]);
        assert_eq!(d.param_names(), vec!["one"]);
        assert_eq!(d.kernel_names(), vec!["add1_add"]);
        assert_eq!(d.num_outputs(), 1);
        assert!(d.check().is_ok());
    }

    #[test]
    fn test_check_forward_reference() {
        let mut d = sample();
        d.nodes[2].inputs = vec![0, 2];
        assert!(d.check().unwrap_err().contains("not earlier"));
    }

    #[test]
    fn test_check_bad_head() {
        let mut d = sample();
        d.heads = vec![7];
        assert!(d.check().is_err());
        d.heads.clear();
        assert!(d.check().is_err());
    }
}
