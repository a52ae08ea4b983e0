// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shapes as they travel in frame headers, manifests and module descriptors.

use std::fmt;

use crate::DType;

/// Row-major dimensions of a tensor.
///
/// Encodes as a bare JSON array (`[2, 3]`). Shapes decoded from a peer are
/// untrusted, so byte sizes should go through [`Shape::checked_byte_len`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    /// ```
    /// use tensor_core::Shape;
    /// let s = Shape::new(vec![4, 1, 8]);
    /// assert_eq!((s.rank(), s.num_elements()), (3, 32));
    /// ```
    pub fn new(dims: Vec<usize>) -> Self {
        Shape(dims)
    }

    /// Rank 0. Holds exactly one element.
    pub fn scalar() -> Self {
        Shape(Vec::new())
    }

    pub fn vector(len: usize) -> Self {
        Shape(vec![len])
    }

    pub fn matrix(rows: usize, cols: usize) -> Self {
        Shape(vec![rows, cols])
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Element count; the empty product makes a scalar count as one.
    pub fn num_elements(&self) -> usize {
        self.0.iter().product()
    }

    /// Byte length for `dtype`, or `None` if it does not fit in `usize`.
    pub fn checked_byte_len(&self, dtype: DType) -> Option<usize> {
        self.0
            .iter()
            .try_fold(dtype.size_bytes(), |acc, &d| acc.checked_mul(d))
    }

    /// Byte length for `dtype`. Saturates instead of wrapping.
    pub fn size_bytes(&self, dtype: DType) -> usize {
        self.checked_byte_len(dtype).unwrap_or(usize::MAX)
    }

    /// `(rows, cols)` when the shape is rank 2.
    pub fn as_matrix(&self) -> Option<(usize, usize)> {
        match self.0.as_slice() {
            &[rows, cols] => Some((rows, cols)),
            _ => None,
        }
    }

    /// Result shape of `[M, K] x [K, N]`.
    pub fn matmul_output(&self, rhs: &Shape) -> Option<Shape> {
        let (m, k) = self.as_matrix()?;
        let (k2, n) = rhs.as_matrix()?;
        (k == k2).then(|| Shape::matrix(m, n))
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_holds_one_element() {
        let s = Shape::scalar();
        assert_eq!(s.rank(), 0);
        assert_eq!(s.num_elements(), 1);
        assert_eq!(s.checked_byte_len(DType::F32), Some(4));
    }

    #[test]
    fn test_zero_sized_dimension() {
        let s = Shape::new(vec![3, 0, 2]);
        assert_eq!(s.num_elements(), 0);
        assert_eq!(s.size_bytes(DType::F32), 0);
    }

    #[test]
    fn test_byte_len_overflow_is_detected() {
        let hostile = Shape::new(vec![usize::MAX / 2, 4]);
        assert_eq!(hostile.checked_byte_len(DType::I8), None);
        assert_eq!(hostile.size_bytes(DType::F32), usize::MAX);
    }

    #[test]
    fn test_matmul_output() {
        let lhs = Shape::matrix(1, 4);
        assert_eq!(
            lhs.matmul_output(&Shape::matrix(4, 8)),
            Some(Shape::matrix(1, 8))
        );
        assert_eq!(lhs.matmul_output(&Shape::matrix(8, 4)), None);
        assert_eq!(Shape::vector(4).matmul_output(&Shape::matrix(4, 8)), None);
    }

    #[test]
    fn test_display_and_json() {
        let s = Shape::new(vec![1, 16, 16]);
        assert_eq!(s.to_string(), "[1, 16, 16]");
        assert_eq!(Shape::scalar().to_string(), "[]");
        assert_eq!(serde_json::to_string(&s).unwrap(), "[1,16,16]");
        let back: Shape = serde_json::from_str("[1,16,16]").unwrap();
        assert_eq!(back, s);
    }
}
