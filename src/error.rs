//! Error type shared by every fitting routine in the crate.

use ndarray::ShapeError;
use ndarray_linalg::error::LinalgError;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FitError>;

/// Everything that can go wrong while fitting a local linear function.
///
/// Rank deficiency is deliberately absent: a rank-deficient design matrix is
/// handled by truncating singular values and yields a minimum-norm solution.
#[derive(Debug, Error)]
pub enum FitError {
    /// Lapack could not compute the singular value decomposition.
    #[error("singular value decomposition failed: {0}")]
    Decomposition(#[from] LinalgError),

    /// Lapack returned without the requested singular vectors.
    #[error("singular value decomposition did not return the {0} singular vectors")]
    IncompleteDecomposition(&'static str),

    /// Lapack returned NaN or infinite singular values.
    #[error("singular value decomposition produced non-finite singular values")]
    NonFiniteDecomposition,

    /// The design matrix has no rows or no columns.
    #[error("design matrix must have at least one row and one column, got {rows}x{cols}")]
    EmptyDesign { rows: usize, cols: usize },

    /// The requested dimensions do not fit in memory at all.
    #[error("{what} of {rows}x{cols} elements overflows usize")]
    DimensionOverflow {
        what: &'static str,
        rows: usize,
        cols: usize,
    },

    /// Two inputs disagree about a dimension.
    #[error("{what} has length {actual}, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A flat buffer does not hold exactly rows * cols elements.
    #[error("{what} buffer has {actual} elements, expected {expected}")]
    BufferLength {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Observation weights divide the residuals and must be strictly positive.
    #[error("weight {index} is {value}, weights must be finite and strictly positive")]
    NonPositiveWeight { index: usize, value: f64 },

    /// NaN or infinity found in the design matrix or targets.
    #[error("{what} contains a non-finite value at index {index}")]
    NonFinite { what: &'static str, index: usize },

    /// Relative truncation tolerance outside of [0, 1).
    #[error("truncation tolerance must be finite and in [0, 1), got {0}")]
    InvalidTolerance(f64),

    /// ndarray refused a shape.
    #[error("invalid matrix shape: {0}")]
    Shape(#[from] ShapeError),
}

impl FitError {
    /// True if the decomposition itself failed, as opposed to the inputs
    /// being rejected up front.
    pub fn is_decomposition_failure(&self) -> bool {
        matches!(
            self,
            FitError::Decomposition(_)
                | FitError::IncompleteDecomposition(_)
                | FitError::NonFiniteDecomposition
        )
    }
}
