//! Numerical validation utilities.

pub mod validation;

pub use validation::{random_stack, AdjointCheckConfig, AdjointCheckResult, AdjointValidator};
