//! Batched tensors and batch/channel dispatch.
//!
//! A [`Stack`] is a tensor of shape `(lead..., rows, cols)` with zero, one
//! or two leading dimensions, stored as a flat list of `rows x cols` slices
//! in row-major leading order. The [`Dispatcher`] runs a projector on every
//! slice independently and restores the leading shape on the way out.

use crate::compute::ExecutionContext;
use crate::error::{format_shape, RadonError, Result};
use crate::geometry::{AngleSet, Geometry};
use crate::projector::{BackProjector, ForwardProjector, Projector};
use crate::types::{DMatrix, Scalar};
use log::{debug, trace};
use num_traits::Float;

/// Maximum number of leading (batch, channel) dimensions.
pub const MAX_LEADING_DIMS: usize = 2;

/// A stack of equally shaped matrices with up to two leading dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Stack<T: Scalar> {
    lead: Vec<usize>,
    rows: usize,
    cols: usize,
    slices: Vec<DMatrix<T>>,
}

impl<T: Scalar> Stack<T> {
    /// Wraps a single matrix with no leading dimensions.
    pub fn from_matrix(matrix: DMatrix<T>) -> Self {
        Self {
            lead: Vec::new(),
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            slices: vec![matrix],
        }
    }

    /// Builds a stack from its leading shape and slices in row-major order.
    ///
    /// Every slice must be `rows x cols`. The slice shape is taken
    /// explicitly so an empty stack still knows its trailing dimensions.
    pub fn from_slices(
        lead: Vec<usize>,
        (rows, cols): (usize, usize),
        slices: Vec<DMatrix<T>>,
    ) -> Result<Self> {
        check_lead(&lead)?;
        let expected: usize = lead.iter().product();
        if slices.len() != expected {
            return Err(RadonError::shape_mismatch(
                format!("{expected} slices for leading shape {}", format_shape(&lead)),
                format!("{} slices", slices.len()),
            ));
        }

        if let Some(bad) = slices.iter().find(|s| s.shape() != (rows, cols)) {
            return Err(RadonError::shape_mismatch(
                format_shape(&[rows, cols]),
                format_shape(&[bad.nrows(), bad.ncols()]),
            ));
        }

        Ok(Self {
            lead,
            rows,
            cols,
            slices,
        })
    }

    /// Builds a stack from a row-major buffer of the given shape.
    ///
    /// `shape` must have between two and four dimensions; the last two are
    /// the slice rows and columns.
    pub fn from_shape_vec(shape: &[usize], data: Vec<T>) -> Result<Self> {
        let (lead, rows, cols) = split_shape(shape)?;
        let total: usize = shape.iter().product();
        if data.len() != total {
            return Err(RadonError::shape_mismatch(
                format!("{total} elements for shape {}", format_shape(shape)),
                format!("{} elements", data.len()),
            ));
        }

        let slice_len = rows * cols;
        let count: usize = lead.iter().product();
        let slices = (0..count)
            .map(|i| DMatrix::from_row_slice(rows, cols, &data[i * slice_len..(i + 1) * slice_len]))
            .collect();

        Ok(Self {
            lead,
            rows,
            cols,
            slices,
        })
    }

    /// A zero-filled stack of the given shape.
    pub fn zeros(shape: &[usize]) -> Result<Self> {
        let (lead, rows, cols) = split_shape(shape)?;
        let count: usize = lead.iter().product();
        Ok(Self {
            lead,
            rows,
            cols,
            slices: vec![DMatrix::zeros(rows, cols); count],
        })
    }

    /// A stack of the same shape filled with `value`.
    pub fn full_like(&self, value: T) -> Self {
        self.map(|_| value)
    }

    /// Full shape `(lead..., rows, cols)`.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = self.lead.clone();
        shape.push(self.rows);
        shape.push(self.cols);
        shape
    }

    /// Leading (batch, channel) dimensions.
    pub fn lead_shape(&self) -> &[usize] {
        &self.lead
    }

    /// Shape `(rows, cols)` of every slice.
    pub fn slice_shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of slices (product of the leading dimensions).
    pub fn num_slices(&self) -> usize {
        self.slices.len()
    }

    /// Total number of scalar elements.
    pub fn num_elements(&self) -> usize {
        self.slices.len() * self.rows * self.cols
    }

    /// All slices in row-major leading order.
    pub fn slices(&self) -> &[DMatrix<T>] {
        &self.slices
    }

    /// Mutable access to the slices. Their shapes must not change.
    pub fn slices_mut(&mut self) -> &mut [DMatrix<T>] {
        &mut self.slices
    }

    /// The slice at flat index `i`.
    pub fn slice(&self, i: usize) -> Option<&DMatrix<T>> {
        self.slices.get(i)
    }

    /// Consumes the stack and returns its slices.
    pub fn into_slices(self) -> Vec<DMatrix<T>> {
        self.slices
    }

    /// Unwraps a stack with no leading dimensions into its matrix.
    pub fn into_matrix(mut self) -> Result<DMatrix<T>> {
        if !self.lead.is_empty() {
            return Err(RadonError::shape_mismatch(
                format_shape(&[self.rows, self.cols]),
                format_shape(&self.shape()),
            ));
        }
        self.slices
            .pop()
            .ok_or_else(|| RadonError::shape_mismatch("one slice", "no slices"))
    }

    /// Same data under a different leading shape with the same slice count.
    pub fn with_lead_shape(self, lead: Vec<usize>) -> Result<Self> {
        Self::from_slices(lead, (self.rows, self.cols), self.slices)
    }

    /// Row-major flat copy of the data.
    pub fn to_vec(&self) -> Vec<T> {
        let mut data = Vec::with_capacity(self.num_elements());
        for slice in &self.slices {
            for row in 0..self.rows {
                data.extend(slice.row(row).iter().copied());
            }
        }
        data
    }

    /// Element at the given full index.
    pub fn get(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.lead.len() + 2 {
            return None;
        }
        let (lead, tail) = index.split_at(self.lead.len());
        let mut flat = 0;
        for (&i, &dim) in lead.iter().zip(&self.lead) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.slices
            .get(flat)
            .and_then(|s| s.get((tail[0], tail[1])).copied())
    }

    /// Applies `f` element-wise.
    pub fn map<F: Fn(T) -> T>(&self, f: F) -> Self {
        Self {
            lead: self.lead.clone(),
            rows: self.rows,
            cols: self.cols,
            slices: self.slices.iter().map(|s| s.map(&f)).collect(),
        }
    }

    /// Combines two stacks of identical shape element-wise.
    pub fn zip_map<F: Fn(T, T) -> T>(&self, other: &Self, f: F) -> Result<Self> {
        self.check_same_shape(other)?;
        Ok(Self {
            lead: self.lead.clone(),
            rows: self.rows,
            cols: self.cols,
            slices: self
                .slices
                .iter()
                .zip(&other.slices)
                .map(|(a, b)| a.zip_map(b, &f))
                .collect(),
        })
    }

    /// Inner product over all elements.
    pub fn dot(&self, other: &Self) -> Result<T> {
        self.check_same_shape(other)?;
        Ok(self
            .slices
            .iter()
            .zip(&other.slices)
            .fold(T::zero(), |acc, (a, b)| acc + a.dot(b)))
    }

    /// Sum of all elements.
    pub fn sum(&self) -> T {
        self.slices.iter().fold(T::zero(), |acc, s| acc + s.sum())
    }

    /// Euclidean (Frobenius) norm over all elements.
    pub fn norm(&self) -> T {
        Float::sqrt(self.slices.iter().fold(T::zero(), |acc, s| acc + s.norm_squared()))
    }

    /// Largest absolute element, zero for an empty stack.
    pub fn max_abs(&self) -> T {
        self.slices
            .iter()
            .flat_map(|s| s.iter())
            .fold(T::zero(), |acc, &v| Float::max(acc, Float::abs(v)))
    }

    fn check_same_shape(&self, other: &Self) -> Result<()> {
        if self.lead == other.lead && self.slice_shape() == other.slice_shape() {
            Ok(())
        } else {
            Err(RadonError::shape_mismatch(
                format_shape(&self.shape()),
                format_shape(&other.shape()),
            ))
        }
    }
}

impl<T: Scalar> From<DMatrix<T>> for Stack<T> {
    fn from(matrix: DMatrix<T>) -> Self {
        Self::from_matrix(matrix)
    }
}

fn check_lead(lead: &[usize]) -> Result<()> {
    if lead.len() > MAX_LEADING_DIMS {
        return Err(RadonError::shape_mismatch(
            format!("at most {MAX_LEADING_DIMS} leading dimensions"),
            format_shape(lead),
        ));
    }
    Ok(())
}

fn split_shape(shape: &[usize]) -> Result<(Vec<usize>, usize, usize)> {
    if shape.len() < 2 {
        return Err(RadonError::shape_mismatch(
            "(..., rows, cols)",
            format_shape(shape),
        ));
    }
    let (lead, tail) = shape.split_at(shape.len() - 2);
    check_lead(lead)?;
    Ok((lead.to_vec(), tail[0], tail[1]))
}

/// Runs projectors over every slice of a [`Stack`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatcher;

impl Dispatcher {
    /// Applies `projector` to every slice of `input`.
    ///
    /// The input is validated once up front; slices are then processed in
    /// isolation and the output keeps the input's leading shape.
    pub fn dispatch<T, P>(
        projector: &P,
        geometry: &Geometry,
        ctx: &ExecutionContext,
        input: &Stack<T>,
        angles: &AngleSet<T>,
    ) -> Result<Stack<T>>
    where
        T: Scalar,
        P: Projector<T> + ?Sized,
    {
        let (rows, cols) = input.slice_shape();
        projector.check_input(geometry, rows, cols, angles)?;

        debug!(
            "{}: input {} with {} angles, {} slices, backend={}",
            projector.name(),
            format_shape(&input.shape()),
            angles.len(),
            input.num_slices(),
            ctx.backend()
        );

        let outputs = ctx.install(|| {
            ctx.map_slices(input.slices(), |i, slice| {
                trace!("{}: slice {i}", projector.name());
                Ok(projector.apply(geometry, ctx, slice, angles))
            })
        })?;

        let output_shape = projector.output_shape(geometry, angles.len());
        Stack::from_slices(input.lead_shape().to_vec(), output_shape, outputs)
    }

    /// Forward projection of every image in `images`.
    pub fn forward<T: Scalar>(
        geometry: &Geometry,
        ctx: &ExecutionContext,
        images: &Stack<T>,
        angles: &AngleSet<T>,
    ) -> Result<Stack<T>> {
        Self::dispatch(&ForwardProjector, geometry, ctx, images, angles)
    }

    /// Back projection of every sinogram in `sinograms`.
    pub fn backprojection<T: Scalar>(
        geometry: &Geometry,
        ctx: &ExecutionContext,
        sinograms: &Stack<T>,
        angles: &AngleSet<T>,
    ) -> Result<Stack<T>> {
        Self::dispatch(&BackProjector, geometry, ctx, sinograms, angles)
    }
}
