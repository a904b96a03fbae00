//! Back projection (sinogram → image), the adjoint of forward projection.
//!
//! Pixel-driven: each output pixel gathers, for every angle, the sinogram
//! bins whose ray samples fall inside its bilinear footprint. The weight of
//! each sample is recomputed exactly as the forward projector computes it,
//! so the two operators are transposes of each other weight for weight.

use super::kernel::{bilinear_weight, ceil_index, clamp_range, floor_index, RayFrame};
use super::Projector;
use crate::compute::ExecutionContext;
use crate::error::Result;
use crate::geometry::{AngleSet, Geometry};
use crate::types::{constants, DMatrix, Image, Scalar, Sinogram};
use log::trace;

/// Computes images from sinograms.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackProjector;

impl BackProjector {
    /// Creates a back projector.
    pub fn new() -> Self {
        Self
    }

    /// Contribution of angle `i` to pixel `(row, col)`.
    fn pixel_sum<T: Scalar>(
        geometry: &Geometry,
        frame: &RayFrame<T>,
        sinogram: &Sinogram<T>,
        i: usize,
        row: usize,
        col: usize,
    ) -> T {
        let center = geometry.center::<T>();
        let reach = constants::sqrt_2::<T>();
        let (s_p, t_p) =
            frame.rotate_back(<T as Scalar>::from_usize(col), <T as Scalar>::from_usize(row));

        // A sample can only touch this pixel if it lies within the pixel's
        // 2x2 bilinear footprint, i.e. closer than sqrt(2) in the ray frame.
        let Some((d_lo, d_hi)) = clamp_range(
            floor_index(s_p + center - reach),
            ceil_index(s_p + center + reach),
            geometry.num_detectors(),
        ) else {
            return T::zero();
        };
        let Some((k_lo, k_hi)) = clamp_range(
            floor_index(t_p + center - reach),
            ceil_index(t_p + center + reach),
            geometry.num_samples(),
        ) else {
            return T::zero();
        };

        let mut acc = T::zero();
        for d in d_lo..=d_hi {
            let value = sinogram[(i, d)];
            if value == T::zero() {
                continue;
            }
            let s = geometry.detector_offset::<T>(d);
            let mut weight = T::zero();
            for k in k_lo..=k_hi {
                let t = geometry.sample_offset::<T>(k);
                if !geometry.in_field_of_view(s, t) {
                    continue;
                }
                let (x, y) = frame.point(s, t);
                weight = weight + bilinear_weight(x, y, row, col);
            }
            acc = acc + weight * value;
        }
        acc * geometry.step::<T>()
    }
}

impl<T: Scalar> Projector<T> for BackProjector {
    fn name(&self) -> &str {
        "backprojection"
    }

    fn input_shape(&self, geometry: &Geometry, num_angles: usize) -> (usize, usize) {
        geometry.sinogram_shape(num_angles)
    }

    fn output_shape(&self, geometry: &Geometry, _num_angles: usize) -> (usize, usize) {
        geometry.image_shape()
    }

    fn check_input(
        &self,
        geometry: &Geometry,
        rows: usize,
        cols: usize,
        angles: &AngleSet<T>,
    ) -> Result<()> {
        geometry.check_sinogram(rows, cols, angles.len())
    }

    fn apply(
        &self,
        geometry: &Geometry,
        ctx: &ExecutionContext,
        sinogram: &Sinogram<T>,
        angles: &AngleSet<T>,
    ) -> Image<T> {
        let size = geometry.size();
        let frames: Vec<RayFrame<T>> = (0..angles.len())
            .map(|i| RayFrame::new(geometry, angles.trig(i)))
            .collect();

        trace!(
            "backprojection: {}x{} sinogram onto {}x{} image",
            sinogram.nrows(),
            sinogram.ncols(),
            size,
            size
        );

        let pixels = ctx.map_cells(size * size, |pixel| {
            let (row, col) = (pixel / size, pixel % size);
            frames
                .iter()
                .enumerate()
                .fold(T::zero(), |acc, (i, frame)| {
                    acc + Self::pixel_sum(geometry, frame, sinogram, i, row, col)
                })
        });

        DMatrix::from_row_slice(size, size, &pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::ForwardProjector;
    use approx::assert_relative_eq;

    fn inner(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        a.component_mul(b).sum()
    }

    #[test]
    fn test_output_shape() {
        let geometry = Geometry::new(16).unwrap();
        let angles = AngleSet::from_slice(&[0.0, 0.7]).unwrap();
        let sinogram = DMatrix::from_element(2, 16, 1.0);
        let image = BackProjector
            .project(&geometry, &ExecutionContext::sequential(), &sinogram, &angles)
            .unwrap();
        assert_eq!(image.shape(), (16, 16));
    }

    #[test]
    fn test_zero_sinogram_gives_zero_image() {
        let geometry = Geometry::new(16).unwrap();
        let angles = AngleSet::from_slice(&[0.0, 0.7, 2.1]).unwrap();
        let sinogram = DMatrix::zeros(3, 16);
        let image = BackProjector
            .project(&geometry, &ExecutionContext::sequential(), &sinogram, &angles)
            .unwrap();
        assert!(image.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_angle_count_mismatch() {
        let geometry = Geometry::new(16).unwrap();
        let angles = AngleSet::from_slice(&[0.0, 0.7, 2.1]).unwrap();
        let sinogram = DMatrix::<f64>::zeros(2, 16);
        let err = BackProjector
            .project(&geometry, &ExecutionContext::sequential(), &sinogram, &angles)
            .unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_is_adjoint_of_forward() {
        let size = 12;
        let geometry = Geometry::new(size).unwrap();
        let ctx = ExecutionContext::sequential();
        let angles = AngleSet::from_slice(&[0.0, 0.3, 1.1, 2.5, 4.0]).unwrap();

        let x = DMatrix::from_fn(size, size, |r, c| ((r * 13 + c * 5) % 7) as f64 - 3.0);
        let y = DMatrix::from_fn(5, size, |r, c| ((r * 3 + c * 11) % 5) as f64 - 2.0);

        let ax = ForwardProjector.project(&geometry, &ctx, &x, &angles).unwrap();
        let aty = BackProjector.project(&geometry, &ctx, &y, &angles).unwrap();

        let lhs = inner(&ax, &y);
        let rhs = inner(&x, &aty);
        assert_relative_eq!(lhs, rhs, max_relative = 1e-10, epsilon = 1e-10);
    }

    #[test]
    fn test_axis_aligned_backprojection_smears_columns() {
        let size = 8;
        let geometry = Geometry::new(size).unwrap();
        let angles = AngleSet::from_slice(&[0.0]).unwrap();
        let mut sinogram = DMatrix::zeros(1, size);
        sinogram[(0, 3)] = 2.0;

        let image = BackProjector
            .project(&geometry, &ExecutionContext::sequential(), &sinogram, &angles)
            .unwrap();

        // Column 3 is filled inside the field of view, every other column is empty.
        for row in 0..size {
            for col in 0..size {
                if col != 3 {
                    assert_eq!(image[(row, col)], 0.0);
                }
            }
        }
        assert_relative_eq!(image[(4, 3)], 2.0);
    }
}
