// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Executes a [`GraphDescriptor`] node by node.

use crate::kernels::{self, KernelFn};
use crate::PeerError;
use artifact_builder::{GraphDescriptor, NodeKind};
use std::collections::HashMap;
use tensor_core::{Tensor, TensorView};

enum Step {
    Input(usize),
    Param(Tensor),
    Kernel { run: KernelFn, inputs: Vec<usize> },
}

/// A graph bound to its parameters and kernels, ready to run.
pub struct GraphExecutor {
    descriptor: GraphDescriptor,
    steps: Vec<Step>,
}

impl GraphExecutor {
    /// Binds `descriptor` to the given parameter tensors.
    ///
    /// `exported` decides whether a kernel name is available in the
    /// module's binary; it must agree with the node's operator.
    pub fn bind(
        descriptor: GraphDescriptor,
        mut params: HashMap<String, Tensor>,
        exported: impl Fn(&str) -> Option<offload_ir::OpKind>,
    ) -> Result<Self, PeerError> {
        descriptor.check().map_err(PeerError::Load)?;

        let mut arg_pos = HashMap::new();
        for (pos, &node) in descriptor.arg_nodes.iter().enumerate() {
            arg_pos.insert(node, pos);
        }

        let mut steps = Vec::with_capacity(descriptor.nodes.len());
        for (i, node) in descriptor.nodes.iter().enumerate() {
            let step = match &node.kind {
                NodeKind::Input => Step::Input(*arg_pos.get(&i).ok_or_else(|| {
                    PeerError::Load(format!("input node '{}' is not an argument", node.name))
                })?),
                NodeKind::Param => {
                    let t = params.remove(&node.name).ok_or_else(|| {
                        PeerError::Load(format!("parameter '{}' missing from blob", node.name))
                    })?;
                    if t.shape() != &node.shape || t.dtype() != node.dtype {
                        return Err(PeerError::Load(format!(
                            "parameter '{}' is {} {}, descriptor expects {} {}",
                            node.name,
                            t.shape(),
                            t.dtype(),
                            node.shape,
                            node.dtype
                        )));
                    }
                    Step::Param(t)
                }
                NodeKind::Kernel { kernel, op } => {
                    match exported(kernel) {
                        Some(exported_op) if exported_op == *op => {}
                        Some(other) => {
                            return Err(PeerError::Load(format!(
                                "kernel '{kernel}' is exported as '{other}', node needs '{op}'"
                            )))
                        }
                        None => {
                            return Err(PeerError::Load(format!(
                                "kernel '{kernel}' not exported by the module binary"
                            )))
                        }
                    }
                    let run = kernels::lookup(*op).ok_or_else(|| {
                        PeerError::Load(format!("operator '{op}' not supported by this peer"))
                    })?;
                    Step::Kernel {
                        run,
                        inputs: node.inputs.clone(),
                    }
                }
            };
            steps.push(step);
        }

        Ok(Self { descriptor, steps })
    }

    pub fn descriptor(&self) -> &GraphDescriptor {
        &self.descriptor
    }

    pub fn num_inputs(&self) -> usize {
        self.descriptor.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.descriptor.num_outputs()
    }

    /// Runs the graph on `inputs`, given in argument order.
    pub fn run(&self, inputs: &[Tensor]) -> Result<Vec<Tensor>, PeerError> {
        if inputs.len() != self.num_inputs() {
            return Err(PeerError::Exec(format!(
                "expected {} input(s), got {}",
                self.num_inputs(),
                inputs.len()
            )));
        }
        for (pos, &node) in self.descriptor.arg_nodes.iter().enumerate() {
            let want = &self.descriptor.nodes[node];
            let got = &inputs[pos];
            if got.shape() != &want.shape || got.dtype() != want.dtype {
                return Err(PeerError::Exec(format!(
                    "input '{}' must be {} {}, got {} {}",
                    want.name,
                    want.shape,
                    want.dtype,
                    got.shape(),
                    got.dtype()
                )));
            }
        }

        let mut values: Vec<Option<Tensor>> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let value = match step {
                // Inputs and params are read in place below.
                Step::Input(_) | Step::Param(_) => None,
                Step::Kernel { run, inputs: operands } => {
                    let views: Vec<TensorView<'_>> = operands
                        .iter()
                        .map(|&j| self.value(j, inputs, &values))
                        .collect();
                    Some(run(&views)?)
                }
            };
            values.push(value);
        }

        Ok(self
            .descriptor
            .heads
            .iter()
            .map(|&h| self.value(h, inputs, &values).to_owned())
            .collect())
    }

    fn value<'a>(
        &'a self,
        node: usize,
        inputs: &'a [Tensor],
        computed: &'a [Option<Tensor>],
    ) -> TensorView<'a> {
        match &self.steps[node] {
            Step::Input(pos) => inputs[*pos].view(),
            Step::Param(t) => t.view(),
            Step::Kernel { .. } => match &computed[node] {
                Some(t) => t.view(),
                None => unreachable!("kernel node {node} read before it ran"),
            },
        }
    }
}
