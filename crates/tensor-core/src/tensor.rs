// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Owned tensors and borrowed views.
//!
//! Data is always a flat row-major little-endian byte buffer. That is the
//! same layout a `module.run` payload and a SafeTensors blob use, so a tensor
//! moves between the wire, the parameter dictionary and the kernels without
//! re-encoding.

use crate::{DType, Shape, TensorError};

const F32_BYTES: usize = 4;

/// Checks `len` against `shape x dtype`.
fn expect_len(shape: &Shape, dtype: DType, len: usize) -> Result<(), TensorError> {
    let expected = shape
        .checked_byte_len(dtype)
        .ok_or_else(|| TensorError::ShapeOverflow {
            shape: shape.clone(),
            dtype,
        })?;
    if expected == len {
        Ok(())
    } else {
        Err(TensorError::BufferSizeMismatch {
            expected,
            actual: len,
        })
    }
}

fn encode_f32<I: IntoIterator<Item = f32>>(values: I) -> Vec<u8> {
    values.into_iter().flat_map(f32::to_le_bytes).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    dtype: DType,
    data: Vec<u8>,
}

impl Tensor {
    /// ```
    /// use tensor_core::{DType, Shape, Tensor};
    /// let t = Tensor::zeros(Shape::matrix(1, 8), DType::F32);
    /// assert_eq!(t.size_bytes(), 32);
    /// ```
    pub fn zeros(shape: Shape, dtype: DType) -> Self {
        let data = vec![0; shape.size_bytes(dtype)];
        Tensor { shape, dtype, data }
    }

    /// Wraps a byte buffer received from a peer or a parameter file.
    ///
    /// Fails with [`TensorError::BufferSizeMismatch`] unless the buffer is
    /// exactly `shape x dtype` bytes long.
    pub fn from_bytes(shape: Shape, dtype: DType, data: Vec<u8>) -> Result<Self, TensorError> {
        expect_len(&shape, dtype, data.len())?;
        Ok(Tensor { shape, dtype, data })
    }

    /// ```
    /// use tensor_core::{Shape, Tensor};
    /// let t = Tensor::from_f32(Shape::vector(2), &[0.5, -1.0]).unwrap();
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![0.5, -1.0]);
    /// ```
    pub fn from_f32(shape: Shape, values: &[f32]) -> Result<Self, TensorError> {
        expect_len(&shape, DType::F32, values.len() * F32_BYTES)?;
        Ok(Tensor {
            data: encode_f32(values.iter().copied()),
            shape,
            dtype: DType::F32,
        })
    }

    pub fn full_f32(shape: Shape, value: f32) -> Self {
        let data = encode_f32(std::iter::repeat(value).take(shape.num_elements()));
        Tensor {
            shape,
            dtype: DType::F32,
            data,
        }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn view(&self) -> TensorView<'_> {
        TensorView::from_parts(&self.shape, self.dtype, &self.data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Payload size on the wire.
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        self.view().to_f32_vec()
    }
}

/// Zero-copy window over tensor bytes owned elsewhere: a [`Tensor`], a frame
/// payload or a memory-mapped parameter file.
#[derive(Debug, Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a Shape,
    dtype: DType,
    data: &'a [u8],
}

impl<'a> TensorView<'a> {
    pub fn from_parts(shape: &'a Shape, dtype: DType, data: &'a [u8]) -> Self {
        TensorView { shape, dtype, data }
    }

    pub fn shape(&self) -> &Shape {
        self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.data
    }

    /// Decodes the bytes as `f32`. Any other dtype is rejected.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        if self.dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op: "to_f32_vec",
                dtype: self.dtype,
            });
        }
        let mut out = Vec::with_capacity(self.data.len() / F32_BYTES);
        for chunk in self.data.chunks_exact(F32_BYTES) {
            let mut word = [0u8; F32_BYTES];
            word.copy_from_slice(chunk);
            out.push(f32::from_le_bytes(word));
        }
        Ok(out)
    }

    pub fn to_owned(&self) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            dtype: self.dtype,
            data: self.data.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_decode_to_zero() {
        let t = Tensor::zeros(Shape::matrix(2, 2), DType::F32);
        assert_eq!(t.size_bytes(), 16);
        assert_eq!(t.to_f32_vec().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_bytes_are_little_endian() {
        let t = Tensor::from_f32(Shape::vector(1), &[1.0]).unwrap();
        assert_eq!(t.as_bytes(), &1.0f32.to_le_bytes());
        let back = Tensor::from_bytes(Shape::vector(1), DType::F32, t.clone().into_bytes()).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn test_from_f32_counts_elements() {
        let err = Tensor::from_f32(Shape::matrix(2, 2), &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            TensorError::BufferSizeMismatch {
                expected: 16,
                actual: 12
            }
        ));
    }

    #[test]
    fn test_from_bytes_rejects_short_payload() {
        let err = Tensor::from_bytes(Shape::vector(4), DType::F32, vec![0; 15]).unwrap_err();
        assert!(matches!(err, TensorError::BufferSizeMismatch { .. }));
    }

    #[test]
    fn test_from_bytes_rejects_overflowing_shape() {
        let shape = Shape::new(vec![usize::MAX, 2]);
        let err = Tensor::from_bytes(shape, DType::F32, Vec::new()).unwrap_err();
        assert!(matches!(err, TensorError::ShapeOverflow { .. }));
    }

    #[test]
    fn test_full_and_scalar() {
        let t = Tensor::full_f32(Shape::scalar(), 2.5);
        assert_eq!(t.to_f32_vec().unwrap(), vec![2.5]);
    }

    #[test]
    fn test_view_copies_back_to_owned() {
        let t = Tensor::from_f32(Shape::vector(3), &[3.0, 2.0, 1.0]).unwrap();
        let view = t.view();
        assert_eq!(view.as_bytes().len(), 12);
        assert_eq!(view.to_owned(), t);
    }

    #[test]
    fn test_i8_has_no_f32_decoding() {
        let t = Tensor::zeros(Shape::vector(2), DType::I8);
        assert!(matches!(
            t.to_f32_vec(),
            Err(TensorError::UnsupportedDType { dtype: DType::I8, .. })
        ));
    }
}
