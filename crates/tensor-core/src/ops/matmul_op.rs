// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `matmul` kernel for rank-2 `f32` operands.

use crate::{DType, Tensor, TensorError, TensorView};

/// `[M, K] x [K, N] -> [M, N]`.
pub fn matmul(lhs: &TensorView<'_>, rhs: &TensorView<'_>) -> Result<Tensor, TensorError> {
    for operand in [lhs, rhs] {
        if operand.dtype() != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "matmul",
                dtype: operand.dtype(),
            });
        }
    }

    let mismatch = || TensorError::ShapeMismatch {
        op: "matmul",
        lhs: lhs.shape().clone(),
        rhs: rhs.shape().clone(),
    };
    let out_shape = lhs.shape().matmul_output(rhs.shape()).ok_or_else(mismatch)?;
    let (rows, inner) = lhs.shape().as_matrix().ok_or_else(mismatch)?;
    let (_, cols) = rhs.shape().as_matrix().ok_or_else(mismatch)?;

    let a = lhs.to_f32_vec()?;
    let b = rhs.to_f32_vec()?;
    let out = row_major_product(&a, &b, rows, inner, cols);
    Tensor::from_f32(out_shape, &out)
}

/// Accumulates each output row as a weighted sum of `b`'s rows.
fn row_major_product(a: &[f32], b: &[f32], rows: usize, inner: usize, cols: usize) -> Vec<f32> {
    if inner == 0 || cols == 0 {
        return vec![0.0; rows * cols];
    }
    let mut out = Vec::with_capacity(rows * cols);
    for a_row in a.chunks_exact(inner) {
        let mut acc = vec![0.0f32; cols];
        for (&weight, b_row) in a_row.iter().zip(b.chunks_exact(cols)) {
            for (slot, &x) in acc.iter_mut().zip(b_row) {
                *slot += weight * x;
            }
        }
        out.extend(acc);
    }
    out
}
