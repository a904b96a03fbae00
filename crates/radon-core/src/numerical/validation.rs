//! Numerical validation of the projector pair.
//!
//! The back projector is only useful as a gradient if it is the adjoint of
//! the forward projector. [`AdjointValidator`] measures
//!
//! ```text
//! |<A x, y> - <x, Aᵀ y>| / (‖x‖ ‖y‖)
//! ```
//!
//! over random `x` and `y` and reports the worst case.

use crate::batch::Stack;
use crate::error::Result;
use crate::geometry::AngleSet;
use crate::radon::Radon;
use crate::types::Scalar;
use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

/// Configuration for adjoint checks.
#[derive(Debug, Clone)]
pub struct AdjointCheckConfig<T> {
    /// Number of random `(x, y)` pairs
    pub trials: usize,
    /// Leading (batch, channel) shape of the random tensors
    pub lead_shape: Vec<usize>,
    /// Maximum accepted relative error
    pub tolerance: T,
}

impl<T: Scalar> Default for AdjointCheckConfig<T> {
    fn default() -> Self {
        Self {
            trials: 5,
            lead_shape: Vec::new(),
            tolerance: T::ADJOINT_TOLERANCE,
        }
    }
}

/// Results from an adjoint check.
#[derive(Debug, Clone)]
pub struct AdjointCheckResult<T> {
    /// Largest relative error over all trials
    pub max_relative_error: T,
    /// Mean relative error over all trials
    pub mean_relative_error: T,
    /// Relative error of every trial
    pub trial_errors: Vec<T>,
    /// Whether every trial stayed below the tolerance
    pub passed: bool,
}

/// Adjoint-law checks for a [`Radon`] operator pair.
pub struct AdjointValidator;

impl AdjointValidator {
    /// Relative adjoint error for one `(x, y)` pair.
    pub fn relative_error<T: Scalar>(
        radon: &Radon,
        x: &Stack<T>,
        y: &Stack<T>,
        angles: &AngleSet<T>,
    ) -> Result<T> {
        let ax = radon.forward(x, angles)?;
        let aty = radon.backprojection(y, angles)?;

        let lhs = ax.dot(y)?;
        let rhs = x.dot(&aty)?;
        let scale = x.norm() * y.norm();
        if scale == T::zero() {
            return Ok(Float::abs(lhs - rhs));
        }
        Ok(Float::abs(lhs - rhs) / scale)
    }

    /// Runs `config.trials` random trials with standard normal data.
    pub fn check<T, R>(
        radon: &Radon,
        angles: &AngleSet<T>,
        config: &AdjointCheckConfig<T>,
        rng: &mut R,
    ) -> Result<AdjointCheckResult<T>>
    where
        T: Scalar,
        R: Rng + ?Sized,
        StandardNormal: Distribution<T>,
    {
        let (rows, cols) = radon.geometry().image_shape();
        let (a_rows, a_cols) = radon.geometry().sinogram_shape(angles.len());

        let mut image_shape = config.lead_shape.clone();
        image_shape.extend([rows, cols]);
        let mut sinogram_shape = config.lead_shape.clone();
        sinogram_shape.extend([a_rows, a_cols]);

        let mut trial_errors = Vec::with_capacity(config.trials);
        for _ in 0..config.trials {
            let x = random_stack(&image_shape, rng)?;
            let y = random_stack(&sinogram_shape, rng)?;
            trial_errors.push(Self::relative_error(radon, &x, &y, angles)?);
        }

        let max_relative_error = trial_errors
            .iter()
            .fold(T::zero(), |acc, &e| Float::max(acc, e));
        let mean_relative_error = if trial_errors.is_empty() {
            T::zero()
        } else {
            trial_errors.iter().copied().fold(T::zero(), |a, b| a + b)
                / <T as Scalar>::from_usize(trial_errors.len())
        };

        Ok(AdjointCheckResult {
            max_relative_error,
            mean_relative_error,
            passed: max_relative_error <= config.tolerance,
            trial_errors,
        })
    }
}

/// A stack of the given shape filled with standard normal samples.
pub fn random_stack<T, R>(shape: &[usize], rng: &mut R) -> Result<Stack<T>>
where
    T: Scalar,
    R: Rng + ?Sized,
    StandardNormal: Distribution<T>,
{
    let len: usize = shape.iter().product();
    let data = (0..len).map(|_| StandardNormal.sample(rng)).collect();
    Stack::from_shape_vec(shape, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::ExecutionContext;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_adjoint_check_passes() {
        let radon = Radon::new(10, ExecutionContext::sequential()).unwrap();
        let angles = AngleSet::linspace(0.0_f64, std::f64::consts::TAU, 6).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let result =
            AdjointValidator::check(&radon, &angles, &AdjointCheckConfig::default(), &mut rng)
                .unwrap();
        assert!(result.passed, "max error {}", result.max_relative_error);
        assert_eq!(result.trial_errors.len(), 5);
        assert!(result.mean_relative_error <= result.max_relative_error);
    }

    #[test]
    fn test_adjoint_check_batched_f32() {
        let radon = Radon::new(8, ExecutionContext::sequential()).unwrap();
        let angles = AngleSet::linspace(0.0_f32, 3.0, 4).unwrap();
        let config = AdjointCheckConfig {
            trials: 3,
            lead_shape: vec![2, 2],
            ..AdjointCheckConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(11);

        let result = AdjointValidator::check(&radon, &angles, &config, &mut rng).unwrap();
        assert!(result.passed, "max error {}", result.max_relative_error);
    }

    #[test]
    fn test_zero_inputs_have_zero_error() {
        let radon = Radon::new(8, ExecutionContext::sequential()).unwrap();
        let angles = AngleSet::linspace(0.0_f64, 3.0, 3).unwrap();
        let x = Stack::zeros(&[8, 8]).unwrap();
        let y = Stack::zeros(&[3, 8]).unwrap();
        let err = AdjointValidator::relative_error(&radon, &x, &y, &angles).unwrap();
        assert_eq!(err, 0.0);
    }
}
