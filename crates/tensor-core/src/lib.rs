// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Lightweight tensor types and kernels shared by both ends of the offload
//! protocol.
//!
//! This crate provides:
//! - [`Tensor`] — an owned n-dimensional tensor in a flat little-endian buffer.
//! - [`Shape`] — runtime shape descriptors.
//! - [`DType`] — supported element data types (f32, f16, bf16, i8).
//! - [`TensorLiteral`] — the JSON form of a tensor used in manifests and
//!   input files.
//! - [`ParamDict`] — a named tensor dictionary serialised as SafeTensors.
//!   This is the `parameters` payload of a compiled artifact.
//! - Kernels: element-wise arithmetic and matrix multiplication, used by the
//!   peer-side graph executor.

mod dtype;
mod error;
mod literal;
mod ops;
mod params;
mod shape;
mod tensor;

pub use dtype::DType;
pub use error::TensorError;
pub use literal::TensorLiteral;
pub use ops::{binary, matmul, unary, BinaryOp, UnaryOp};
pub use params::ParamDict;
pub use shape::Shape;
pub use tensor::{Tensor, TensorView};
