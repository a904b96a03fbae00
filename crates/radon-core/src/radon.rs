//! Entry point pairing a geometry with an execution context.

use crate::batch::{Dispatcher, Stack};
use crate::compute::ExecutionContext;
use crate::error::Result;
use crate::geometry::{AngleSet, Geometry};
use crate::types::{Image, Scalar, Sinogram};
use log::debug;

/// Radon transform and back-projection for one image resolution.
///
/// Build it once per `size` and reuse it across calls and batches; the
/// angle set is supplied per call and may change from call to call.
///
/// # Example
///
/// ```
/// use radon_core::prelude::*;
///
/// let radon = Radon::new(32, ExecutionContext::default()).unwrap();
/// let angles = AngleSet::linspace(0.0_f64, std::f64::consts::PI, 8).unwrap();
///
/// let images = Stack::zeros(&[2, 3, 32, 32]).unwrap();
/// let sinograms = radon.forward(&images, &angles).unwrap();
/// assert_eq!(sinograms.shape(), vec![2, 3, 8, 32]);
///
/// let back = radon.backprojection(&sinograms, &angles).unwrap();
/// assert_eq!(back.shape(), vec![2, 3, 32, 32]);
/// ```
#[derive(Debug, Clone)]
pub struct Radon {
    geometry: Geometry,
    ctx: ExecutionContext,
}

impl Radon {
    /// Creates the operator pair for `size x size` images.
    pub fn new(size: usize, ctx: ExecutionContext) -> Result<Self> {
        let geometry = Geometry::new(size)?;
        debug!(
            "radon: size={size}, backend={}, threads={}",
            ctx.backend(),
            ctx.num_threads()
        );
        Ok(Self { geometry, ctx })
    }

    /// Creates the operator pair from an existing geometry.
    pub fn with_geometry(geometry: Geometry, ctx: ExecutionContext) -> Self {
        Self { geometry, ctx }
    }

    /// The scanning geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// The execution context used for every call.
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// Image side length.
    pub fn size(&self) -> usize {
        self.geometry.size()
    }

    /// Number of detector bins per projection.
    pub fn num_detectors(&self) -> usize {
        self.geometry.num_detectors()
    }

    /// Forward projection: `(..., size, size)` → `(..., A, num_detectors)`.
    pub fn forward<T: Scalar>(&self, images: &Stack<T>, angles: &AngleSet<T>) -> Result<Stack<T>> {
        Dispatcher::forward(&self.geometry, &self.ctx, images, angles)
    }

    /// Back projection: `(..., A, num_detectors)` → `(..., size, size)`.
    pub fn backprojection<T: Scalar>(
        &self,
        sinograms: &Stack<T>,
        angles: &AngleSet<T>,
    ) -> Result<Stack<T>> {
        Dispatcher::backprojection(&self.geometry, &self.ctx, sinograms, angles)
    }

    /// Forward projection of a single unbatched image.
    pub fn forward_image<T: Scalar>(
        &self,
        image: &Image<T>,
        angles: &AngleSet<T>,
    ) -> Result<Sinogram<T>> {
        self.forward(&Stack::from_matrix(image.clone()), angles)?
            .into_matrix()
    }

    /// Back projection of a single unbatched sinogram.
    pub fn backproject_sinogram<T: Scalar>(
        &self,
        sinogram: &Sinogram<T>,
        angles: &AngleSet<T>,
    ) -> Result<Image<T>> {
        self.backprojection(&Stack::from_matrix(sinogram.clone()), angles)?
            .into_matrix()
    }
}
