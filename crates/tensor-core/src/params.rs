// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named tensor dictionaries serialised in SafeTensors format.
//!
//! The `parameters` payload of a compiled artifact is a [`ParamDict`]
//! encoded with [`ParamDict::to_bytes`]. The peer decodes it with
//! [`ParamDict::from_bytes`], typically straight from a memory-mapped file.

use crate::{DType, Shape, Tensor, TensorError};
use std::collections::BTreeMap;

/// An ordered `name → tensor` dictionary.
///
/// Ordering is by name, so two dictionaries with the same contents always
/// serialise to the same bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamDict {
    tensors: BTreeMap<String, Tensor>,
}

impl ParamDict {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tensor, replacing any previous entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, tensor: Tensor) -> Option<Tensor> {
        self.tensors.insert(name.into(), tensor)
    }

    /// Looks up a tensor by name.
    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.tensors.get(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Returns `true` if the dictionary holds no tensors.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Iterates entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Tensor)> {
        self.tensors.iter()
    }

    /// Total payload size of all tensors in bytes.
    pub fn total_bytes(&self) -> usize {
        self.tensors.values().map(Tensor::size_bytes).sum()
    }

    /// Serialises the dictionary into a SafeTensors buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TensorError> {
        let mut views = Vec::with_capacity(self.tensors.len());
        for (name, tensor) in &self.tensors {
            let view = safetensors::tensor::TensorView::new(
                tensor.dtype().to_safetensors(),
                tensor.shape().dims().to_vec(),
                tensor.as_bytes(),
            )
            .map_err(|e| TensorError::Params(format!("tensor '{name}': {e}")))?;
            views.push((name.as_str(), view));
        }
        safetensors::serialize(views, &None)
            .map_err(|e| TensorError::Params(format!("serialise failed: {e}")))
    }

    /// Decodes a SafeTensors buffer into an owned dictionary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TensorError> {
        let st = safetensors::SafeTensors::deserialize(bytes)
            .map_err(|e| TensorError::Params(format!("SafeTensors parse error: {e}")))?;

        let mut dict = ParamDict::new();
        for (name, view) in st.tensors() {
            let dtype = DType::from_safetensors(view.dtype()).ok_or_else(|| {
                TensorError::Params(format!(
                    "tensor '{name}' has unsupported dtype {:?}",
                    view.dtype()
                ))
            })?;
            let tensor = Tensor::from_bytes(
                Shape::new(view.shape().to_vec()),
                dtype,
                view.data().to_vec(),
            )?;
            dict.insert(name, tensor);
        }
        tracing::debug!(
            "decoded parameter dictionary: {} tensors, {} bytes",
            dict.len(),
            dict.total_bytes()
        );
        Ok(dict)
    }
}

impl FromIterator<(String, Tensor)> for ParamDict {
    fn from_iter<I: IntoIterator<Item = (String, Tensor)>>(iter: I) -> Self {
        Self {
            tensors: iter.into_iter().collect(),
        }
    }
}
