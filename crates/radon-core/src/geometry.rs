//! Scanning geometry and projection angles.
//!
//! Coordinates follow the image grid: pixel `(row, col)` has its centre at
//! `x = col`, `y = row`. The rotation centre sits at `(center, center)` with
//! `center = (size - 1) / 2`, and the field of view is the inscribed circle
//! of radius `size / 2`.
//!
//! A ray at angle θ through detector `d` is sampled at
//!
//! ```text
//! x(k) = center + s·cosθ − t·sinθ
//! y(k) = center + s·sinθ + t·cosθ
//! ```
//!
//! with `s = d − center` and `t = k − center` for `k in 0..num_samples`.
//! Both projectors use exactly this grid.

use crate::error::{format_shape, RadonError, Result};
use crate::types::Scalar;
use log::debug;
use num_traits::Float;

/// Immutable description of the scanning setup for one image resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    size: usize,
    num_detectors: usize,
    num_samples: usize,
}

impl Geometry {
    /// Creates the geometry for `size x size` images.
    ///
    /// Fails with a geometry error when `size` is zero.
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(RadonError::geometry("image size must be positive"));
        }

        let geometry = Self {
            size,
            num_detectors: size,
            num_samples: size,
        };
        debug!(
            "geometry: size={}, num_detectors={}, num_samples={}",
            geometry.size, geometry.num_detectors, geometry.num_samples
        );
        Ok(geometry)
    }

    /// Image side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of detector bins per projection.
    pub fn num_detectors(&self) -> usize {
        self.num_detectors
    }

    /// Number of samples taken along each ray.
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Shape `(size, size)` of an image.
    pub fn image_shape(&self) -> (usize, usize) {
        (self.size, self.size)
    }

    /// Shape `(num_angles, num_detectors)` of a sinogram.
    pub fn sinogram_shape(&self, num_angles: usize) -> (usize, usize) {
        (num_angles, self.num_detectors)
    }

    /// Coordinate of the rotation centre on both axes.
    pub fn center<T: Scalar>(&self) -> T {
        (<T as Scalar>::from_usize(self.size) - T::one()) / <T as Scalar>::from_f64(2.0)
    }

    /// Radius of the field-of-view circle.
    pub fn radius<T: Scalar>(&self) -> T {
        <T as Scalar>::from_usize(self.size) / <T as Scalar>::from_f64(2.0)
    }

    /// Sampling step along a ray, in pixels.
    pub fn step<T: Scalar>(&self) -> T {
        T::one()
    }

    /// Signed offset of detector `d` from the rotation centre.
    pub fn detector_offset<T: Scalar>(&self, d: usize) -> T {
        <T as Scalar>::from_usize(d) - self.center::<T>()
    }

    /// Signed offset of ray sample `k` from the rotation centre.
    pub fn sample_offset<T: Scalar>(&self, k: usize) -> T {
        <T as Scalar>::from_usize(k) - self.center::<T>()
    }

    /// Whether the ray-frame point `(s, t)` lies inside the field of view.
    pub fn in_field_of_view<T: Scalar>(&self, s: T, t: T) -> bool {
        let r = self.radius::<T>();
        s * s + t * t <= r * r
    }

    /// Checks that an image has shape `(size, size)`.
    pub fn check_image(&self, rows: usize, cols: usize) -> Result<()> {
        if (rows, cols) == self.image_shape() {
            Ok(())
        } else {
            Err(RadonError::shape_mismatch(
                format_shape(&[self.size, self.size]),
                format_shape(&[rows, cols]),
            ))
        }
    }

    /// Checks that a sinogram has shape `(num_angles, num_detectors)`.
    pub fn check_sinogram(&self, rows: usize, cols: usize, num_angles: usize) -> Result<()> {
        if (rows, cols) == self.sinogram_shape(num_angles) {
            Ok(())
        } else {
            Err(RadonError::shape_mismatch(
                format_shape(&[num_angles, self.num_detectors]),
                format_shape(&[rows, cols]),
            ))
        }
    }
}

/// Plain configuration value for a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeometryConfig {
    /// Image side length
    pub size: usize,
}

impl GeometryConfig {
    /// Creates a configuration for `size x size` images.
    pub fn new(size: usize) -> Self {
        Self { size }
    }

    /// Validates the configuration and builds the geometry.
    pub fn build(&self) -> Result<Geometry> {
        Geometry::new(self.size)
    }
}

impl From<Geometry> for GeometryConfig {
    fn from(geometry: Geometry) -> Self {
        Self {
            size: geometry.size,
        }
    }
}

/// Ordered set of projection angles, in radians.
///
/// Row `i` of a sinogram belongs to angle `i`. The same set must be used
/// for a forward call and the back-projection that should be its adjoint.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSet<T: Scalar> {
    values: Vec<T>,
    cos: Vec<T>,
    sin: Vec<T>,
}

impl<T: Scalar> AngleSet<T> {
    /// Creates an angle set, rejecting empty or non-finite input.
    pub fn new(values: Vec<T>) -> Result<Self> {
        if values.is_empty() {
            return Err(RadonError::geometry("angle set must not be empty"));
        }
        if let Some(i) = values.iter().position(|a| !Float::is_finite(*a)) {
            return Err(RadonError::geometry(format!(
                "angle {i} is not finite: {}",
                values[i]
            )));
        }

        let cos = values.iter().map(|&a| Float::cos(a)).collect();
        let sin = values.iter().map(|&a| Float::sin(a)).collect();
        Ok(Self { values, cos, sin })
    }

    /// Creates an angle set from a slice.
    pub fn from_slice(values: &[T]) -> Result<Self> {
        Self::new(values.to_vec())
    }

    /// `n` evenly spaced angles from `start` to `end`, both included.
    pub fn linspace(start: T, end: T, n: usize) -> Result<Self> {
        let values = match n {
            0 => Vec::new(),
            1 => vec![start],
            _ => {
                let step = (end - start) / <T as Scalar>::from_usize(n - 1);
                (0..n)
                    .map(|i| start + step * <T as Scalar>::from_usize(i))
                    .collect()
            }
        };
        Self::new(values)
    }

    /// `n` evenly spaced angles covering `[0, π)`.
    pub fn half_turn(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(RadonError::geometry("angle set must not be empty"));
        }
        let step = crate::types::constants::pi::<T>() / <T as Scalar>::from_usize(n);
        Self::new((0..n).map(|i| step * <T as Scalar>::from_usize(i)).collect())
    }

    /// Number of angles.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: an angle set holds at least one angle.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The angle values.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// `(cos θ, sin θ)` for angle `i`.
    #[inline]
    pub fn trig(&self, i: usize) -> (T, T) {
        (self.cos[i], self.sin[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geometry_rejects_zero_size() {
        let err = Geometry::new(0).unwrap_err();
        assert!(err.is_geometry_error());
    }

    #[test]
    fn test_geometry_derived_constants() {
        let geometry = Geometry::new(64).unwrap();
        assert_eq!(geometry.num_detectors(), 64);
        assert_eq!(geometry.num_samples(), 64);
        assert_eq!(geometry.image_shape(), (64, 64));
        assert_eq!(geometry.sinogram_shape(10), (10, 64));
        assert_relative_eq!(geometry.center::<f64>(), 31.5);
        assert_relative_eq!(geometry.radius::<f64>(), 32.0);
        assert_relative_eq!(geometry.detector_offset::<f64>(0), -31.5);
        assert_relative_eq!(geometry.sample_offset::<f64>(63), 31.5);
    }

    #[test]
    fn test_field_of_view() {
        let geometry = Geometry::new(8).unwrap();
        assert!(geometry.in_field_of_view(0.0_f64, 0.0));
        assert!(geometry.in_field_of_view(4.0_f64, 0.0));
        assert!(!geometry.in_field_of_view(3.5_f64, 3.5));
    }

    #[test]
    fn test_shape_checks() {
        let geometry = Geometry::new(16).unwrap();
        assert!(geometry.check_image(16, 16).is_ok());
        assert!(geometry.check_image(16, 15).unwrap_err().is_shape_error());
        assert!(geometry.check_sinogram(5, 16, 5).is_ok());
        assert!(geometry.check_sinogram(4, 16, 5).unwrap_err().is_shape_error());
    }

    #[test]
    fn test_geometry_config() {
        let config = GeometryConfig::new(32);
        let geometry = config.build().unwrap();
        assert_eq!(GeometryConfig::from(geometry), config);
        assert!(GeometryConfig::new(0).build().is_err());
    }

    #[test]
    fn test_angle_set_validation() {
        assert!(AngleSet::<f64>::new(vec![]).unwrap_err().is_geometry_error());
        // Every constructor routes through the same check, so projectors
        // never see an empty set.
        assert!(AngleSet::<f64>::from_slice(&[]).is_err());
        assert!(AngleSet::<f64>::linspace(0.0, 1.0, 0).is_err());
        assert!(AngleSet::<f64>::half_turn(0).is_err());
        assert!(AngleSet::new(vec![0.0, f64::NAN]).is_err());
        assert!(AngleSet::new(vec![0.0_f32, 1.0]).is_ok());
    }

    #[test]
    fn test_linspace_includes_endpoints() {
        let angles = AngleSet::linspace(0.0_f64, std::f64::consts::TAU, 10).unwrap();
        assert_eq!(angles.len(), 10);
        assert_relative_eq!(angles.values()[0], 0.0);
        assert_relative_eq!(angles.values()[9], std::f64::consts::TAU);

        let single = AngleSet::linspace(0.3_f64, 1.0, 1).unwrap();
        assert_eq!(single.values(), &[0.3]);
        assert!(AngleSet::linspace(0.0_f64, 1.0, 0).is_err());
    }

    #[test]
    fn test_trig_is_precomputed() {
        let angles = AngleSet::<f64>::half_turn(4).unwrap();
        let (c, s) = angles.trig(2);
        assert_relative_eq!(c, 0.0_f64, epsilon = 1e-12);
        assert_relative_eq!(s, 1.0_f64, epsilon = 1e-12);
    }
}
