// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor kernels.
//!
//! Every kernel takes borrowed views and returns a freshly allocated output
//! tensor. Only `F32` is supported; other dtypes are rejected with
//! [`crate::TensorError::UnsupportedDType`].

mod elementwise;
mod matmul_op;

pub use elementwise::{binary, unary, BinaryOp, UnaryOp};
pub use matmul_op::matmul;
