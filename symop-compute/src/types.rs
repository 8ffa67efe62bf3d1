//! The closed catalog of value types an expression can have.
//!
//! Types are used only for dispatch (operators are registered per operand-type tuple) and for
//! the layout of emitted code. No runtime values are ever typed with them.

use std::fmt;

/// The type of an expression node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    /// A real number, `double` in emitted code.
    Scalar,

    /// A 3-component column vector.
    Vec3,

    /// A 4-component column vector, usually a homogeneous point.
    Vec4,

    /// A 3x3 matrix, stored column-major.
    Mat33,

    /// A 4x4 matrix, stored column-major.
    Mat44,

    /// A symbolic real standing in for a literal. It is laid out like [`Type::Scalar`], but is a
    /// distinct key for dispatch: operators taking it must be registered separately.
    GenericScalar,
}

impl Type {
    /// Every type in the catalog.
    pub const ALL: [Type; 6] = [
        Type::Scalar,
        Type::Vec3,
        Type::Vec4,
        Type::Mat33,
        Type::Mat44,
        Type::GenericScalar,
    ];

    /// Returns the number of rows and columns of a value of this type. Vectors are columns.
    pub fn dims(self) -> (usize, usize) {
        match self {
            Type::Scalar | Type::GenericScalar => (1, 1),
            Type::Vec3 => (3, 1),
            Type::Vec4 => (4, 1),
            Type::Mat33 => (3, 3),
            Type::Mat44 => (4, 4),
        }
    }

    /// Returns the number of scalar components in a value of this type.
    pub fn len(self) -> usize {
        let (rows, cols) = self.dims();
        rows * cols
    }

    /// Returns true if values of this type are a single real number.
    pub fn is_scalar(self) -> bool {
        matches!(self, Type::Scalar | Type::GenericScalar)
    }

    /// Returns true if values of this type are column vectors.
    pub fn is_vector(self) -> bool {
        matches!(self, Type::Vec3 | Type::Vec4)
    }

    /// Returns true if values of this type are square matrices.
    pub fn is_matrix(self) -> bool {
        matches!(self, Type::Mat33 | Type::Mat44)
    }

    /// Returns the flat, column-major index of element `(row, col)`.
    pub fn flat_index(self, row: usize, col: usize) -> usize {
        let (rows, _) = self.dims();
        row + rows * col
    }

    /// Returns the name of the type, as used in signatures and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Type::Scalar => "Scalar",
            Type::Vec3 => "Vec3",
            Type::Vec4 => "Vec4",
            Type::Mat33 => "Mat33",
            Type::Mat44 => "Mat44",
            Type::GenericScalar => "GenericScalar",
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_counts() {
        let lens = Type::ALL.map(Type::len);
        assert_eq!(lens, [1, 3, 4, 9, 16, 1]);
    }

    #[test]
    fn column_major_index() {
        assert_eq!(Type::Mat44.flat_index(0, 0), 0);
        assert_eq!(Type::Mat44.flat_index(1, 0), 1);
        assert_eq!(Type::Mat44.flat_index(0, 3), 12);
        assert_eq!(Type::Mat44.flat_index(2, 3), 14);
        assert_eq!(Type::Mat33.flat_index(2, 1), 5);
    }
}
