// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Failures raised while building, decoding or computing on tensors.

use crate::{DType, Shape};

#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// Buffer length disagrees with `shape x dtype`.
    #[error("tensor buffer holds {actual} bytes but its shape needs {expected}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// `shape x dtype` does not fit in addressable memory.
    #[error("shape {shape} of {dtype} overflows the address space")]
    ShapeOverflow { shape: Shape, dtype: DType },

    #[error("{op}: operand shapes {lhs} and {rhs} do not line up")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// Only `f32` has kernels.
    #[error("{op} has no {dtype} kernel")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// SafeTensors encode or decode failure.
    #[error("parameter blob: {0}")]
    Params(String),
}
