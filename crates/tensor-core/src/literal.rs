// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! JSON form of a tensor.

use crate::{Shape, Tensor, TensorError};

/// A tensor written out as a shape and a flat list of `f32` values.
///
/// ```json
/// { "shape": [2, 2], "values": [1.0, 2.0, 3.0, 4.0] }
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TensorLiteral {
    pub shape: Shape,
    pub values: Vec<f32>,
}

impl TensorLiteral {
    /// Converts the literal into an owned `f32` tensor.
    pub fn to_tensor(&self) -> Result<Tensor, TensorError> {
        Tensor::from_f32(self.shape.clone(), &self.values)
    }

    /// Builds a literal from an `f32` tensor.
    pub fn from_tensor(tensor: &Tensor) -> Result<Self, TensorError> {
        Ok(Self {
            shape: tensor.shape().clone(),
            values: tensor.to_f32_vec()?,
        })
    }
}
