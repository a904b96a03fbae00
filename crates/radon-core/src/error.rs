//! Error types for projection operations.
//!
//! Every check happens at call entry. A call that returns an error has
//! produced no output and has left the geometry untouched.

use thiserror::Error;

/// Errors that can occur while building a geometry or running a projector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RadonError {
    /// Input trailing or leading dimensions do not match what the call expects.
    ///
    /// Raised when an image is not `size x size`, a sinogram does not have
    /// `num_detectors` columns or one row per angle, or when the leading
    /// (batch, channel) dimensions of a tensor are malformed.
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    Shape {
        /// Expected shape
        expected: String,
        /// Actual shape
        actual: String,
    },

    /// Invalid scanning geometry.
    ///
    /// Raised for a zero image size, an empty angle set or non-finite angles.
    #[error("Invalid geometry: {reason}")]
    Geometry {
        /// Description of the geometry problem
        reason: String,
    },

    /// The execution substrate could not provide the requested resources.
    #[error("Resource unavailable: {reason}")]
    Resource {
        /// Description of the resource failure
        reason: String,
    },
}

impl RadonError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::Shape {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a geometry error with a custom reason.
    pub fn geometry<S: Into<String>>(reason: S) -> Self {
        Self::Geometry {
            reason: reason.into(),
        }
    }

    /// Create a resource error with a custom reason.
    pub fn resource<S: Into<String>>(reason: S) -> Self {
        Self::Resource {
            reason: reason.into(),
        }
    }

    /// Returns true for shape errors.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::Shape { .. })
    }

    /// Returns true for geometry errors.
    pub fn is_geometry_error(&self) -> bool {
        matches!(self, Self::Geometry { .. })
    }
}

impl From<rayon::ThreadPoolBuildError> for RadonError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Self::resource(format!("failed to build thread pool: {err}"))
    }
}

/// Formats a shape as `(d0, d1, ...)`.
pub(crate) fn format_shape(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
    format!("({})", dims.join(", "))
}

/// Result type alias for projection operations.
pub type Result<T> = std::result::Result<T, RadonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RadonError::shape_mismatch("(64, 64)", "(32, 32)");
        assert!(err.is_shape_error());
        assert_eq!(
            err.to_string(),
            "Shape mismatch: expected (64, 64), got (32, 32)"
        );

        let err = RadonError::geometry("image size must be positive");
        assert!(err.is_geometry_error());
        assert_eq!(
            err.to_string(),
            "Invalid geometry: image size must be positive"
        );
    }

    #[test]
    fn test_error_display() {
        let errors = vec![
            RadonError::shape_mismatch("(10, 64)", "(9, 64)"),
            RadonError::geometry("empty angle set"),
            RadonError::resource("thread pool"),
        ];

        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn test_format_shape() {
        assert_eq!(format_shape(&[2, 3, 64, 64]), "(2, 3, 64, 64)");
        assert_eq!(format_shape(&[]), "()");
    }
}
