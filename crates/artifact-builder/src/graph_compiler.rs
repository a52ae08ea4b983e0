// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reference compiler producing a [`KernelLibrary`], a [`GraphDescriptor`]
//! and a SafeTensors parameter blob.

use crate::descriptor::{GraphDescriptor, Node, NodeKind};
use crate::kernel_lib::{KernelExport, KernelLibrary};
use crate::{CompileError, Compiler, RawArtifacts, Target};
use offload_ir::{Expr, OpKind, SubgraphUnit};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use tensor_core::{DType, ParamDict, Shape};

static BUILD_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Compiles units into graphs of built-in kernels.
#[derive(Debug, Clone, Default)]
pub struct GraphCompiler;

impl GraphCompiler {
    pub fn new() -> Self {
        Self
    }

    /// Lowers `unit` into a descriptor plus the kernel export table.
    pub fn lower(
        &self,
        unit: &SubgraphUnit,
        target: &Target,
    ) -> Result<(GraphDescriptor, Vec<KernelExport>), CompileError> {
        let mut g = Lowering {
            symbol: &unit.symbol,
            nodes: Vec::new(),
            vars: HashMap::new(),
            consts: HashMap::new(),
            exports: Vec::new(),
            kernels: 0,
        };

        let mut arg_nodes = Vec::with_capacity(unit.params.len());
        for p in &unit.params {
            if p.dtype != DType::F32 {
                return Err(CompileError::Unsupported(format!(
                    "input '{}' has dtype {}, only f32 is supported",
                    p.name, p.dtype
                )));
            }
            let idx = g.push(Node {
                name: p.name.clone(),
                kind: NodeKind::Input,
                inputs: vec![],
                shape: p.shape.clone(),
                dtype: p.dtype,
            });
            g.vars.insert(p.name.clone(), idx);
            arg_nodes.push(idx);
        }

        for (name, literal) in &unit.constants {
            let idx = g.push(Node {
                name: name.clone(),
                kind: NodeKind::Param,
                inputs: vec![],
                shape: literal.shape.clone(),
                dtype: DType::F32,
            });
            g.consts.insert(name.clone(), idx);
        }

        let heads = match &unit.body {
            Expr::Tuple { fields } => fields
                .iter()
                .map(|f| g.lower(f))
                .collect::<Result<Vec<_>, _>>()?,
            other => vec![g.lower(other)?],
        };

        let descriptor = GraphDescriptor {
            symbol: unit.symbol.clone(),
            target: target.to_string(),
            nodes: g.nodes,
            arg_nodes,
            heads,
        };
        descriptor.check().map_err(CompileError::Unsupported)?;
        Ok((descriptor, g.exports))
    }
}

impl Compiler for GraphCompiler {
    fn name(&self) -> &str {
        "graph"
    }

    fn compile(&self, unit: &SubgraphUnit, target: &Target) -> Result<RawArtifacts, CompileError> {
        let (descriptor, exports) = self.lower(unit, target)?;

        let library = KernelLibrary {
            target: target.to_string(),
            build_id: next_build_id(),
            exports,
        };

        let mut params = ParamDict::new();
        for (name, literal) in &unit.constants {
            params.insert(name.clone(), literal.to_tensor()?);
        }

        tracing::debug!(
            "lowered '{}': {} nodes, {} kernels, {} params",
            unit.symbol,
            descriptor.nodes.len(),
            library.exports.len(),
            params.len()
        );

        Ok(RawArtifacts {
            binary: library.to_bytes(),
            descriptor: descriptor.to_json()?,
            parameters: params.to_bytes()?,
        })
    }
}

fn next_build_id() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = BUILD_COUNTER.fetch_add(1, Ordering::Relaxed);
    nanos ^ seq.rotate_left(48) ^ u64::from(std::process::id())
}

struct Lowering<'a> {
    symbol: &'a str,
    nodes: Vec<Node>,
    vars: HashMap<String, usize>,
    consts: HashMap<String, usize>,
    exports: Vec<KernelExport>,
    kernels: usize,
}

impl Lowering<'_> {
    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn lower(&mut self, expr: &Expr) -> Result<usize, CompileError> {
        match expr {
            Expr::Var { name } => self.vars.get(name).copied().ok_or_else(|| {
                CompileError::Unsupported(format!("variable '{name}' is not an input"))
            }),
            Expr::Constant { name } => self.consts.get(name).copied().ok_or_else(|| {
                CompileError::Unsupported(format!("constant '{name}' has no value"))
            }),
            Expr::Call { op, args } => {
                let inputs = args
                    .iter()
                    .map(|a| self.lower(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let name = format!("{}_{}_{}", self.symbol, op, self.kernels);
                let shape = self.infer(&name, *op, &inputs)?;
                let kernel = format!("{}_{}", self.symbol, op);
                if !self.exports.iter().any(|e| e.name == kernel) {
                    self.exports.push(KernelExport {
                        name: kernel.clone(),
                        op: *op,
                    });
                }
                self.kernels += 1;
                Ok(self.push(Node {
                    name,
                    kind: NodeKind::Kernel { kernel, op: *op },
                    inputs,
                    shape,
                    dtype: DType::F32,
                }))
            }
            Expr::CallFunction { function, .. } => Err(CompileError::Unsupported(format!(
                "call to '{function}' was not inlined"
            ))),
            Expr::Tuple { .. } => Err(CompileError::Unsupported(
                "nested tuple in function body".into(),
            )),
        }
    }

    fn infer(&self, node: &str, op: OpKind, inputs: &[usize]) -> Result<Shape, CompileError> {
        let shape_err = |detail: String| CompileError::Shape {
            node: node.to_string(),
            detail,
        };
        let shapes: Vec<&Shape> = inputs.iter().map(|&i| &self.nodes[i].shape).collect();
        match (op, shapes.as_slice()) {
            (OpKind::Negate | OpKind::Relu, [a]) => Ok((*a).clone()),
            (OpKind::Matmul, [a, b]) => a.matmul_output(b).ok_or_else(|| {
                shape_err(format!("cannot multiply {a} by {b}"))
            }),
            (_, [a, b]) if a == b => Ok((*a).clone()),
            (_, [a, b]) if a.rank() == 0 => Ok((*b).clone()),
            (_, [a, b]) if b.rank() == 0 => Ok((*a).clone()),
            (_, [a, b]) => Err(shape_err(format!("'{op}' operands {a} and {b} differ"))),
            _ => Err(shape_err(format!(
                "'{op}' takes {} operand(s), got {}",
                op.arity(),
                inputs.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_ir::{resolve, ModuleLoader};

    fn unit(body: &str, params: &str) -> SubgraphUnit {
        let json = format!(
            r#"{{
                "name": "t",
                "constants": {{
                    "one": {{ "shape": [], "values": [1.0] }},
                    "w": {{ "shape": [3, 2], "values": [1, 0, 0, 1, 1, 1] }}
                }},
                "functions": [{{
                    "name": "f",
                    "params": {params},
                    "body": {body},
                    "attrs": {{ "compiler": "remote" }}
                }}]
            }}"#
        );
        let module = ModuleLoader::from_json(&json).unwrap();
        resolve(&module, "remote", "f").unwrap()
    }

    fn add1() -> SubgraphUnit {
        unit(
            r#"{ "kind": "call", "op": "add", "args": [
                { "kind": "var", "name": "x" }, { "kind": "constant", "name": "one" } ] }"#,
            r#"[{ "name": "x", "shape": [4] }]"#,
        )
    }

    #[test]
    fn test_lower_add1() {
        let (d, exports) = GraphCompiler::new().lower(&add1(), &Target::llvm()).unwrap();
        assert_eq!(d.nodes.len(), 3);
        assert_eq!(d.arg_nodes, vec![0]);
        assert_eq!(d.heads, vec![2]);
        assert_eq!(d.nodes[2].shape, Shape::vector(4));
        assert_eq!(d.param_names(), vec!["one"]);
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].name, "f_add");
    }

    #[test]
    fn test_matmul_shape() {
        let u = unit(
            r#"{ "kind": "call", "op": "matmul", "args": [
                { "kind": "var", "name": "x" }, { "kind": "constant", "name": "w" } ] }"#,
            r#"[{ "name": "x", "shape": [5, 3] }]"#,
        );
        let (d, _) = GraphCompiler::new().lower(&u, &Target::llvm()).unwrap();
        assert_eq!(d.nodes[d.heads[0]].shape, Shape::matrix(5, 2));
    }

    #[test]
    fn test_shape_error() {
        let u = unit(
            r#"{ "kind": "call", "op": "matmul", "args": [
                { "kind": "var", "name": "x" }, { "kind": "constant", "name": "w" } ] }"#,
            r#"[{ "name": "x", "shape": [5, 4] }]"#,
        );
        let err = GraphCompiler::new().compile(&u, &Target::llvm()).unwrap_err();
        assert!(matches!(err, CompileError::Shape { .. }));
    }

    #[test]
    fn test_tuple_heads() {
        let u = unit(
            r#"{ "kind": "tuple", "fields": [
                { "kind": "call", "op": "relu", "args": [{ "kind": "var", "name": "x" }] },
                { "kind": "call", "op": "negate", "args": [{ "kind": "var", "name": "x" }] } ] }"#,
            r#"[{ "name": "x", "shape": [2] }]"#,
        );
        let (d, exports) = GraphCompiler::new().lower(&u, &Target::llvm()).unwrap();
        assert_eq!(d.num_outputs(), 2);
        assert_eq!(exports.len(), 2);
    }

    #[test]
    fn test_compile_outputs_decode() {
        let raw = GraphCompiler::new().compile(&add1(), &Target::llvm()).unwrap();
        let lib = KernelLibrary::from_bytes(&raw.binary).unwrap();
        assert_eq!(lib.target, "llvm");
        assert_eq!(lib.lookup("f_add"), Some(OpKind::Add));
        let d = GraphDescriptor::from_json(&raw.descriptor).unwrap();
        assert_eq!(d.symbol, "f");
        let params = ParamDict::from_bytes(&raw.parameters).unwrap();
        assert!(params.get("one").is_some());
    }

    #[test]
    fn test_build_id_varies() {
        let c = GraphCompiler::new();
        let a = c.compile(&add1(), &Target::llvm()).unwrap();
        let b = c.compile(&add1(), &Target::llvm()).unwrap();
        assert_ne!(a.binary, b.binary);
        assert_eq!(a.descriptor, b.descriptor);
        assert_eq!(a.parameters, b.parameters);
    }
}
