// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Built-in kernel table.
//!
//! Every kernel exported by a kernel library names one of these operators;
//! the peer runs its own implementation of it.

use offload_ir::OpKind;
use tensor_core::{binary, matmul, unary, BinaryOp, Tensor, TensorError, TensorView, UnaryOp};

/// A kernel entry point.
pub type KernelFn = fn(&[TensorView<'_>]) -> Result<Tensor, TensorError>;

fn add(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    binary(BinaryOp::Add, &a[0], &a[1])
}

fn subtract(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    binary(BinaryOp::Subtract, &a[0], &a[1])
}

fn multiply(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    binary(BinaryOp::Multiply, &a[0], &a[1])
}

fn divide(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    binary(BinaryOp::Divide, &a[0], &a[1])
}

fn maximum(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    binary(BinaryOp::Maximum, &a[0], &a[1])
}

fn negate(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    unary(UnaryOp::Negate, &a[0])
}

fn relu(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    unary(UnaryOp::Relu, &a[0])
}

fn matmul2d(a: &[TensorView<'_>]) -> Result<Tensor, TensorError> {
    matmul(&a[0], &a[1])
}

/// Returns the built-in implementation of `op`. Callers pass exactly
/// `op.arity()` operands.
pub fn lookup(op: OpKind) -> Option<KernelFn> {
    let f: KernelFn = match op {
        OpKind::Add => add,
        OpKind::Subtract => subtract,
        OpKind::Multiply => multiply,
        OpKind::Divide => divide,
        OpKind::Maximum => maximum,
        OpKind::Negate => negate,
        OpKind::Relu => relu,
        OpKind::Matmul => matmul2d,
    };
    Some(f)
}

/// Names of the operators this peer can run.
pub fn supported() -> Vec<&'static str> {
    [
        OpKind::Add,
        OpKind::Subtract,
        OpKind::Multiply,
        OpKind::Divide,
        OpKind::Maximum,
        OpKind::Negate,
        OpKind::Relu,
        OpKind::Matmul,
    ]
    .into_iter()
    .filter(|op| lookup(*op).is_some())
    .map(OpKind::as_str)
    .collect()
}
