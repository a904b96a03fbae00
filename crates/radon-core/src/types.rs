//! Type definitions and aliases for projection kernels.
//!
//! This module provides the scalar trait shared by all kernels, the
//! matrix aliases used for images and sinograms, and numerical constants.

use nalgebra::{Dyn, OMatrix, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};
use std::iter::Sum;

/// Trait for scalar types used by the projectors (f32 or f64).
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Sum
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default relative tolerance for the adjoint law.
    const ADJOINT_TOLERANCE: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging/display).
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for grid indices).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const ADJOINT_TOLERANCE: Self = 1e-3;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const ADJOINT_TOLERANCE: Self = 1e-6;
}

/// Type alias for a dynamically-sized matrix.
pub type DMatrix<T> = OMatrix<T, Dyn, Dyn>;

/// A `size x size` image.
pub type Image<T> = DMatrix<T>;

/// A `num_angles x num_detectors` sinogram.
pub type Sinogram<T> = DMatrix<T>;

/// Numerical constants for different precision levels.
pub mod constants {
    use super::Scalar;

    /// Get machine epsilon for the given scalar type.
    pub fn epsilon<T: Scalar>() -> T {
        T::EPSILON
    }

    /// Get default adjoint-law tolerance.
    pub fn adjoint_tolerance<T: Scalar>() -> T {
        T::ADJOINT_TOLERANCE
    }

    /// Square root of 2, the half-diagonal of the bilinear footprint.
    pub fn sqrt_2<T: Scalar>() -> T {
        <T as Scalar>::from_f64(std::f64::consts::SQRT_2)
    }

    /// Pi constant.
    pub fn pi<T: Scalar>() -> T {
        <T as Scalar>::from_f64(std::f64::consts::PI)
    }

    /// Two pi, a full turn.
    pub fn two_pi<T: Scalar>() -> T {
        <T as Scalar>::from_f64(std::f64::consts::TAU)
    }
}
