//! Fixed literal values held by constant nodes.
//!
//! A [`Literal`] is a type plus its components, flattened column-major: element `(row, col)` of
//! an `n`x`n` matrix is stored at index `row + n * col`. Vectors are columns, so their components
//! are simply in order.
//!
//! The arithmetic helpers here are used by the `fold` hooks of the standard operators to compute
//! constant results at compile time.

use crate::error::invalid_literal;
use crate::types::Type;
use symop_error::Error;

/// A constant value of some [`Type`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Literal {
    ty: Type,
    data: Vec<f64>,
}

impl Literal {
    /// Creates a literal from its flattened components. Returns [`Err`] if the number of
    /// components does not match the type.
    pub fn new(ty: Type, data: Vec<f64>) -> Result<Self, Error> {
        if data.len() != ty.len() {
            return Err(invalid_literal(ty, data.len()));
        }
        Ok(Self { ty, data })
    }

    /// Creates a literal whose `i`th flattened component is `f(i)`.
    pub fn from_fn(ty: Type, f: impl FnMut(usize) -> f64) -> Self {
        Self { ty, data: (0..ty.len()).map(f).collect() }
    }

    /// Creates a [`Type::Scalar`] literal.
    pub fn scalar(value: f64) -> Self {
        Self { ty: Type::Scalar, data: vec![value] }
    }

    /// The additive identity of the given type.
    pub fn zero(ty: Type) -> Self {
        Self::from_fn(ty, |_| 0.0)
    }

    /// The multiplicative identity of the given type: `1` for scalars, the identity matrix for
    /// matrices, and all ones (the element-wise identity) for vectors.
    pub fn one(ty: Type) -> Self {
        let (rows, cols) = ty.dims();
        if ty.is_matrix() {
            Self::from_fn(ty, |i| if i % rows == i / rows { 1.0 } else { 0.0 })
        } else {
            debug_assert!(cols == 1);
            Self::from_fn(ty, |_| 1.0)
        }
    }

    /// A literal that is one at flattened index `index` and zero elsewhere.
    pub fn one_hot(ty: Type, index: usize) -> Self {
        Self::from_fn(ty, |i| if i == index { 1.0 } else { 0.0 })
    }

    /// The type of the literal.
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// The flattened components of the literal.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// If the literal is a single real number, returns it.
    pub fn as_scalar(&self) -> Option<f64> {
        if self.ty.is_scalar() {
            Some(self.data[0])
        } else {
            None
        }
    }

    /// Returns element `(row, col)`. Vectors have a single column.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.ty.flat_index(row, col)]
    }

    /// Returns true if every component is zero.
    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&x| x == 0.0)
    }

    /// Returns true if this is the multiplicative identity of its type.
    pub fn is_one(&self) -> bool {
        *self == Self::one(self.ty)
    }

    /// Applies `f` to every component.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self { ty: self.ty, data: self.data.iter().map(|&x| f(x)).collect() }
    }

    /// Combines the components of two literals of the same type pairwise.
    pub fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        debug_assert_eq!(self.ty, other.ty);
        Self {
            ty: self.ty,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        }
    }

    /// Multiplies every component by `factor`.
    pub fn scale(&self, factor: f64) -> Self {
        self.map(|x| factor * x)
    }

    /// The matrix product `self * rhs`, with the given result type.
    pub fn matmul(&self, rhs: &Self, ty: Type) -> Self {
        let (rows, inner) = self.ty.dims();
        let (_, cols) = rhs.ty.dims();
        debug_assert_eq!(ty.dims(), (rows, cols));
        Self::from_fn(ty, |i| {
            let (row, col) = (i % rows, i / rows);
            (0..inner).map(|k| self.get(row, k) * rhs.get(k, col)).sum()
        })
    }

    /// The transpose of a matrix.
    pub fn transpose(&self) -> Self {
        let (rows, _) = self.ty.dims();
        Self::from_fn(self.ty, |i| self.get(i / rows, i % rows))
    }

    /// The sum of the component-wise products of two literals of the same type (the Frobenius
    /// inner product for matrices).
    pub fn dot(&self, other: &Self) -> f64 {
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    /// The outer product `u * v^T` of two column vectors, with the given (square) result type.
    pub fn outer(u: &Self, v: &Self, ty: Type) -> Self {
        let (rows, _) = ty.dims();
        Self::from_fn(ty, |i| u.data[i % rows] * v.data[i / rows])
    }
}
