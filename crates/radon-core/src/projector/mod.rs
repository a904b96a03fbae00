//! Forward and back projection kernels.
//!
//! Both projectors implement [`Projector`], which works on one unbatched
//! slice. Leading batch/channel dimensions are handled by
//! [`crate::batch::Dispatcher`].

pub mod backward;
pub mod forward;
pub(crate) mod kernel;

pub use backward::BackProjector;
pub use forward::ForwardProjector;

use crate::compute::ExecutionContext;
use crate::error::Result;
use crate::geometry::{AngleSet, Geometry};
use crate::types::{DMatrix, Scalar};
use std::fmt::Debug;

/// A linear projection operator acting on one slice.
///
/// Implementations are stateless: everything they need comes from the
/// geometry, the execution context and the angle set of the call.
pub trait Projector<T: Scalar>: Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Shape `(rows, cols)` of one input slice.
    fn input_shape(&self, geometry: &Geometry, num_angles: usize) -> (usize, usize);

    /// Shape `(rows, cols)` of one output slice.
    fn output_shape(&self, geometry: &Geometry, num_angles: usize) -> (usize, usize);

    /// Checks one input slice of shape `(rows, cols)`.
    fn check_input(
        &self,
        geometry: &Geometry,
        rows: usize,
        cols: usize,
        angles: &AngleSet<T>,
    ) -> Result<()>;

    /// Applies the operator to one validated slice.
    fn apply(
        &self,
        geometry: &Geometry,
        ctx: &ExecutionContext,
        input: &DMatrix<T>,
        angles: &AngleSet<T>,
    ) -> DMatrix<T>;

    /// Validates then applies the operator to one slice.
    fn project(
        &self,
        geometry: &Geometry,
        ctx: &ExecutionContext,
        input: &DMatrix<T>,
        angles: &AngleSet<T>,
    ) -> Result<DMatrix<T>> {
        self.check_input(geometry, input.nrows(), input.ncols(), angles)?;
        Ok(self.apply(geometry, ctx, input, angles))
    }
}
