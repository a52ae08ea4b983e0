// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Element-wise binary and unary kernels.

use crate::{DType, Tensor, TensorError, TensorView};

/// Element-wise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Maximum,
}

impl BinaryOp {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Maximum => "maximum",
        }
    }

    #[inline]
    fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            Self::Maximum => a.max(b),
        }
    }
}

/// Element-wise unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Relu,
}

impl UnaryOp {
    fn name(self) -> &'static str {
        match self {
            Self::Negate => "negate",
            Self::Relu => "relu",
        }
    }

    #[inline]
    fn apply(self, x: f32) -> f32 {
        match self {
            Self::Negate => -x,
            Self::Relu => x.max(0.0),
        }
    }
}

/// Applies `op` element by element.
///
/// Shapes must be equal, except that either side may be a rank-0 scalar,
/// which is broadcast against the other operand.
pub fn binary(
    op: BinaryOp,
    lhs: &TensorView<'_>,
    rhs: &TensorView<'_>,
) -> Result<Tensor, TensorError> {
    check_f32(op.name(), lhs)?;
    check_f32(op.name(), rhs)?;

    let a = lhs.to_f32_vec()?;
    let b = rhs.to_f32_vec()?;

    let (shape, out): (_, Vec<f32>) = if lhs.shape() == rhs.shape() {
        (
            lhs.shape().clone(),
            a.iter().zip(&b).map(|(&x, &y)| op.apply(x, y)).collect(),
        )
    } else if rhs.shape().rank() == 0 {
        (
            lhs.shape().clone(),
            a.iter().map(|&x| op.apply(x, b[0])).collect(),
        )
    } else if lhs.shape().rank() == 0 {
        (
            rhs.shape().clone(),
            b.iter().map(|&y| op.apply(a[0], y)).collect(),
        )
    } else {
        return Err(TensorError::ShapeMismatch {
            op: op.name(),
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    };

    Tensor::from_f32(shape, &out)
}

/// Applies a unary `op` to every element.
pub fn unary(op: UnaryOp, input: &TensorView<'_>) -> Result<Tensor, TensorError> {
    check_f32(op.name(), input)?;
    let out: Vec<f32> = input.to_f32_vec()?.into_iter().map(|x| op.apply(x)).collect();
    Tensor::from_f32(input.shape().clone(), &out)
}

fn check_f32(op: &'static str, view: &TensorView<'_>) -> Result<(), TensorError> {
    if view.dtype() != DType::F32 {
        return Err(TensorError::UnsupportedDType {
            op,
            dtype: view.dtype(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shape;

    fn t(shape: Shape, v: &[f32]) -> Tensor {
        Tensor::from_f32(shape, v).unwrap()
    }

    #[test]
    fn test_add_same_shape() {
        let a = t(Shape::matrix(2, 2), &[1.0, 2.0, 3.0, 4.0]);
        let b = t(Shape::matrix(2, 2), &[10.0, 20.0, 30.0, 40.0]);
        let c = binary(BinaryOp::Add, &a.view(), &b.view()).unwrap();
        assert_eq!(c.to_f32_vec().unwrap(), vec![11.0, 22.0, 33.0, 44.0]);
    }

    #[test]
    fn test_scalar_broadcast_both_sides() {
        let a = t(Shape::vector(3), &[1.0, 2.0, 3.0]);
        let one = t(Shape::scalar(), &[1.0]);
        let c = binary(BinaryOp::Add, &a.view(), &one.view()).unwrap();
        assert_eq!(c.to_f32_vec().unwrap(), vec![2.0, 3.0, 4.0]);

        let d = binary(BinaryOp::Subtract, &one.view(), &a.view()).unwrap();
        assert_eq!(d.to_f32_vec().unwrap(), vec![0.0, -1.0, -2.0]);
        assert_eq!(d.shape(), &Shape::vector(3));
    }

    #[test]
    fn test_shape_mismatch() {
        let a = t(Shape::vector(3), &[1.0, 2.0, 3.0]);
        let b = t(Shape::vector(2), &[1.0, 2.0]);
        let err = binary(BinaryOp::Multiply, &a.view(), &b.view()).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { op: "multiply", .. }));
    }

    #[test]
    fn test_maximum_and_divide() {
        let a = t(Shape::vector(2), &[1.0, 8.0]);
        let b = t(Shape::vector(2), &[4.0, 2.0]);
        let m = binary(BinaryOp::Maximum, &a.view(), &b.view()).unwrap();
        assert_eq!(m.to_f32_vec().unwrap(), vec![4.0, 8.0]);
        let d = binary(BinaryOp::Divide, &a.view(), &b.view()).unwrap();
        assert_eq!(d.to_f32_vec().unwrap(), vec![0.25, 4.0]);
    }

    #[test]
    fn test_unary() {
        let a = t(Shape::vector(3), &[-1.0, 0.0, 2.0]);
        let r = unary(UnaryOp::Relu, &a.view()).unwrap();
        assert_eq!(r.to_f32_vec().unwrap(), vec![0.0, 0.0, 2.0]);
        let n = unary(UnaryOp::Negate, &a.view()).unwrap();
        assert_eq!(n.to_f32_vec().unwrap(), vec![1.0, -0.0, -2.0]);
    }

    #[test]
    fn test_rejects_non_f32() {
        let a = Tensor::zeros(Shape::vector(2), DType::I8);
        assert!(unary(UnaryOp::Relu, &a.view()).is_err());
    }
}
