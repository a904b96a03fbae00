//! Interpolation kernel shared by both projectors.
//!
//! The forward projector reads the image with bilinear weights at every ray
//! sample; the back projector writes sinogram values back with the very same
//! weights. Both go through [`RayFrame::point`] and [`bilinear_weight`], so a
//! weight computed in one direction is bit-identical to its transpose.
//!
//! Boundary policy: neighbours outside the image contribute zero (zero
//! padding) and samples outside the field-of-view circle are skipped.

use crate::geometry::Geometry;
use crate::types::{DMatrix, Scalar};
use num_traits::Float;

/// Ray frame for one projection angle.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RayFrame<T: Scalar> {
    center: T,
    cos: T,
    sin: T,
}

impl<T: Scalar> RayFrame<T> {
    pub(crate) fn new(geometry: &Geometry, (cos, sin): (T, T)) -> Self {
        Self {
            center: geometry.center(),
            cos,
            sin,
        }
    }

    /// Image coordinates `(x, y)` of the ray-frame point `(s, t)`.
    #[inline]
    pub(crate) fn point(&self, s: T, t: T) -> (T, T) {
        (
            self.center + s * self.cos - t * self.sin,
            self.center + s * self.sin + t * self.cos,
        )
    }

    /// Ray-frame coordinates `(s, t)` of the image point `(x, y)`.
    #[inline]
    pub(crate) fn rotate_back(&self, x: T, y: T) -> (T, T) {
        let dx = x - self.center;
        let dy = y - self.center;
        (dx * self.cos + dy * self.sin, dy * self.cos - dx * self.sin)
    }
}

/// Linear interpolation weight `max(0, 1 - |v|)`.
#[inline]
pub(crate) fn hat<T: Scalar>(v: T) -> T {
    let w = T::one() - Float::abs(v);
    if w > T::zero() {
        w
    } else {
        T::zero()
    }
}

/// Bilinear weight of pixel `(row, col)` for the point `(x, y)`.
#[inline]
pub(crate) fn bilinear_weight<T: Scalar>(x: T, y: T, row: usize, col: usize) -> T {
    hat(x - <T as Scalar>::from_usize(col)) * hat(y - <T as Scalar>::from_usize(row))
}

/// `floor(v)` as a signed index.
#[inline]
pub(crate) fn floor_index<T: Scalar>(v: T) -> isize {
    num_traits::cast::<T, isize>(Float::floor(v)).unwrap_or(isize::MIN)
}

/// `ceil(v)` as a signed index.
#[inline]
pub(crate) fn ceil_index<T: Scalar>(v: T) -> isize {
    num_traits::cast::<T, isize>(Float::ceil(v)).unwrap_or(isize::MAX)
}

/// Clamps the inclusive index range `[lo, hi]` to `0..len`.
///
/// Returns `None` when the clamped range is empty.
#[inline]
pub(crate) fn clamp_range(lo: isize, hi: isize, len: usize) -> Option<(usize, usize)> {
    let max = isize::try_from(len).ok()? - 1;
    let lo = lo.max(0);
    let hi = hi.min(max);
    if lo > hi {
        None
    } else {
        Some((lo as usize, hi as usize))
    }
}

/// Bilinear sample of `image` at `(x, y)` with zero padding.
#[inline]
pub(crate) fn bilinear_sample<T: Scalar>(image: &DMatrix<T>, x: T, y: T) -> T {
    let (rows, cols) = image.shape();
    let x0 = floor_index(x);
    let y0 = floor_index(y);

    let mut value = T::zero();
    for row in y0..=y0 + 1 {
        if row < 0 || row as usize >= rows {
            continue;
        }
        for col in x0..=x0 + 1 {
            if col < 0 || col as usize >= cols {
                continue;
            }
            let (row, col) = (row as usize, col as usize);
            let w = bilinear_weight(x, y, row, col);
            if w > T::zero() {
                value = value + w * image[(row, col)];
            }
        }
    }
    value
}
