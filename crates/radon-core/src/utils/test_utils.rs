//! Test data for projector tests.
//!
//! Available to other crates through the `test-utils` feature.

use crate::batch::Stack;
use crate::error::{RadonError, Result};
use crate::geometry::{AngleSet, Geometry};
use crate::numerical::random_stack;
use crate::types::{DMatrix, Image, Scalar};
use num_traits::Float;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

/// Image with a single unit pixel at `(row, col)`.
pub fn impulse_image<T: Scalar>(size: usize, row: usize, col: usize) -> Result<Image<T>> {
    if row >= size || col >= size {
        return Err(RadonError::shape_mismatch(
            format!("pixel inside ({size}, {size})"),
            format!("({row}, {col})"),
        ));
    }
    let mut image = DMatrix::zeros(size, size);
    image[(row, col)] = T::one();
    Ok(image)
}

/// Image that is one inside a centred disc of the given radius, zero outside.
pub fn disc_phantom<T: Scalar>(geometry: &Geometry, radius: T) -> Image<T> {
    let center = geometry.center::<T>();
    let size = geometry.size();
    DMatrix::from_fn(size, size, |row, col| {
        let x = <T as Scalar>::from_usize(col) - center;
        let y = <T as Scalar>::from_usize(row) - center;
        if x * x + y * y <= radius * radius {
            T::one()
        } else {
            T::zero()
        }
    })
}

/// Seeded random images of shape `(lead..., size, size)`.
pub fn random_images<T>(geometry: &Geometry, lead: &[usize], seed: u64) -> Result<Stack<T>>
where
    T: Scalar,
    StandardNormal: Distribution<T>,
{
    let (rows, cols) = geometry.image_shape();
    let mut shape = lead.to_vec();
    shape.extend([rows, cols]);
    random_stack(&shape, &mut StdRng::seed_from_u64(seed))
}

/// Seeded random sinograms of shape `(lead..., A, num_detectors)`.
pub fn random_sinograms<T>(
    geometry: &Geometry,
    lead: &[usize],
    angles: &AngleSet<T>,
    seed: u64,
) -> Result<Stack<T>>
where
    T: Scalar,
    StandardNormal: Distribution<T>,
{
    let (rows, cols) = geometry.sinogram_shape(angles.len());
    let mut shape = lead.to_vec();
    shape.extend([rows, cols]);
    random_stack(&shape, &mut StdRng::seed_from_u64(seed))
}

/// Largest element-wise absolute difference between two stacks.
pub fn max_abs_difference<T: Scalar>(a: &Stack<T>, b: &Stack<T>) -> Result<T> {
    Ok(a.zip_map(b, |x, y| x - y)?.max_abs())
}

/// Index of the largest value in each row of `matrix`.
pub fn row_argmax<T: Scalar>(matrix: &DMatrix<T>) -> Vec<usize> {
    matrix
        .row_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, <T as Float>::neg_infinity()), |(best, max), (j, &v)| {
                    if v > max {
                        (j, v)
                    } else {
                        (best, max)
                    }
                })
                .0
        })
        .collect()
}

/// Position `(row, col)` of the largest value in `matrix`.
pub fn argmax<T: Scalar>(matrix: &DMatrix<T>) -> (usize, usize) {
    let (mut best, mut max) = ((0, 0), <T as Float>::neg_infinity());
    for row in 0..matrix.nrows() {
        for col in 0..matrix.ncols() {
            if matrix[(row, col)] > max {
                max = matrix[(row, col)];
                best = (row, col);
            }
        }
    }
    best
}
