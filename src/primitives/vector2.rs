//! 2D integer vector type.

use num_traits::{PrimInt, Signed};
use std::ops::{Add, Neg, Sub};

/// A 2D vector representing an integer offset.
///
/// `dot` and `cross` return the component type; callers working near the
/// edges of the `i64` range should widen through [`crate::predicates`]
/// instead, which computes in 128 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vector2<T> {
    pub x: T,
    pub y: T,
}

impl<T: PrimInt> Vector2<T> {
    /// Creates a new vector.
    #[inline]
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }

    /// Creates a zero vector.
    #[inline]
    pub fn zero() -> Self {
        Self::new(T::zero(), T::zero())
    }

    /// Computes the dot product with another vector.
    #[inline]
    pub fn dot(self, other: Self) -> T {
        self.x * other.x + self.y * other.y
    }

    /// Computes the 2D cross product (perpendicular dot product).
    ///
    /// Positive means `other` is counter-clockwise from `self`.
    #[inline]
    pub fn cross(self, other: Self) -> T {
        self.x * other.y - self.y * other.x
    }
}

impl<T: PrimInt + Signed> Vector2<T> {
    /// Returns this vector rotated 90 degrees counter-clockwise.
    #[inline]
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }
}

impl<T: PrimInt> Add for Vector2<T> {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl<T: PrimInt> Sub for Vector2<T> {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl<T: PrimInt + Signed> Neg for Vector2<T> {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_and_cross() {
        let a = Vector2::new(2_i64, 0);
        let b = Vector2::new(0_i64, 3);
        assert_eq!(a.dot(b), 0);
        assert_eq!(a.cross(b), 6);
        assert_eq!(b.cross(a), -6);
    }

    #[test]
    fn test_perpendicular() {
        assert_eq!(Vector2::new(1_i64, 0).perpendicular(), Vector2::new(0, 1));
    }
}
