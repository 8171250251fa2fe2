//! Linear least squares (lls) fit of one local linear function.
//!
//! This module ties the pieces together: validate the inputs, decompose the
//! design matrix (see <pseudoinverse.rs>), solve for the parameters, and
//! compute the diagnostics (see <diagnostics.rs>).
//!
//! Two entry points are offered.  [`fit()`] takes ndarray arrays and returns an
//! owned [`LinearFit`].  [`fit_into()`] takes flat row-major buffers and fills
//! caller-owned output buffers, which is convenient when the caller keeps its
//! own storage for every piece of a larger model.

use crate::diagnostics::{chi_square, covariance};
use crate::error::{FitError, Result};
use crate::marshal::{copy_row_major_into, element_count, row_major_to_matrix};
use crate::pseudoinverse::{check_tolerance, TruncatedSvd, TruncatedSvdOutput, DEFAULT_TOL};
use ndarray::{Array1, Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2};

/// Knobs for a single fit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOptions {
    /// Singular values strictly below `tolerance * max(singular values)` are
    /// treated as zero.
    pub tolerance: f64,
    /// Reject NaN and infinite values in the design matrix and targets before
    /// handing them to lapack.
    pub check_finite: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            tolerance: DEFAULT_TOL,
            check_finite: true,
        }
    }
}

impl FitOptions {
    /// Set the relative truncation tolerance, see [`FitOptions::tolerance`].
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Turn the NaN/infinity check of the inputs on or off.
    pub fn with_check_finite(mut self, check_finite: bool) -> Self {
        self.check_finite = check_finite;
        self
    }
}

/// Everything computed by one fit.
#[derive(Clone, Debug)]
pub struct LinearFit {
    /// Fitted parameters, one per column of the design matrix.
    pub solution: Array1<f64>,
    /// Parameter covariance up to the noise variance, symmetric.
    pub covariance: Array2<f64>,
    /// Weighted residual sum of squares.
    pub chi_square: f64,
    /// The truncated decomposition the solution was computed from.
    pub svd: TruncatedSvdOutput,
}

impl LinearFit {
    pub fn nrows(&self) -> usize {
        self.svd.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.svd.ncols()
    }

    /// Number of singular values that survived truncation.
    pub fn rank(&self) -> usize {
        self.svd.rank
    }

    /// Singular values after truncation.
    pub fn singular_values(&self) -> &Array1<f64> {
        &self.svd.singular_values
    }

    /// Evaluate the fitted function on new observations (one per row).
    pub fn predict<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<Array1<f64>>
    where
        S: Data<Elem = f64>,
    {
        if x.ncols() != self.ncols() {
            return Err(FitError::DimensionMismatch {
                what: "prediction columns",
                expected: self.ncols(),
                actual: x.ncols(),
            });
        }
        Ok(x.dot(&self.solution))
    }
}

fn check_finite(what: &'static str, values: ArrayView1<'_, f64>) -> Result<()> {
    match values.iter().position(|el| !el.is_finite()) {
        Some(index) => Err(FitError::NonFinite { what, index }),
        None => Ok(()),
    }
}

fn validate<S1, S2, S3>(
    x: &ArrayBase<S1, Ix2>,
    y: &ArrayBase<S2, Ix1>,
    s: &ArrayBase<S3, Ix1>,
    options: &FitOptions,
) -> Result<()>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    S3: Data<Elem = f64>,
{
    check_tolerance(options.tolerance)?;
    let (n_rows, n_cols) = x.dim();
    if n_rows == 0 || n_cols == 0 {
        return Err(FitError::EmptyDesign {
            rows: n_rows,
            cols: n_cols,
        });
    }
    if y.len() != n_rows {
        return Err(FitError::DimensionMismatch {
            what: "target vector",
            expected: n_rows,
            actual: y.len(),
        });
    }
    if s.len() != n_rows {
        return Err(FitError::DimensionMismatch {
            what: "weight vector",
            expected: n_rows,
            actual: s.len(),
        });
    }
    if let Some((index, &value)) = s
        .iter()
        .enumerate()
        .find(|&(_, &el)| !(el.is_finite() && el > 0.))
    {
        return Err(FitError::NonPositiveWeight { index, value });
    }
    if options.check_finite {
        // Flattened index into the row-major design matrix.
        if let Some(index) = x.iter().position(|el| !el.is_finite()) {
            return Err(FitError::NonFinite {
                what: "design matrix",
                index,
            });
        }
        check_finite("target vector", y.view())?;
    }
    Ok(())
}

/// Fit `x * a = y` with per-observation weights `s` using default options.
///
/// Each row of `x` is an observation and each column a predictor.  Weights
/// divide the residuals in the chi-square, they do not change the solution.
pub fn fit<S1, S2, S3>(
    x: &ArrayBase<S1, Ix2>,
    y: &ArrayBase<S2, Ix1>,
    s: &ArrayBase<S3, Ix1>,
) -> Result<LinearFit>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    S3: Data<Elem = f64>,
{
    fit_with_options(x, y, s, &FitOptions::default())
}

/// Same as [`fit()`] with explicit [`FitOptions`].
pub fn fit_with_options<S1, S2, S3>(
    x: &ArrayBase<S1, Ix2>,
    y: &ArrayBase<S2, Ix1>,
    s: &ArrayBase<S3, Ix1>,
    options: &FitOptions,
) -> Result<LinearFit>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    S3: Data<Elem = f64>,
{
    validate(x, y, s, options)?;
    log::debug!("fitting {}x{} design matrix", x.nrows(), x.ncols());

    let svd = x.truncated_svd_with_tol(options.tolerance)?;
    let solution = svd.solve(y)?;
    let chi_square = chi_square(x, y, s, &solution)?;
    let covariance = covariance(&svd.v, &svd.sigma_pinv)?;

    Ok(LinearFit {
        solution,
        covariance,
        chi_square,
        svd,
    })
}

/// Caller-owned output buffers for [`fit_into()`].
///
/// Matrices are written in row-major order.
pub struct FitBuffers<'a> {
    /// `n_cols` fitted parameters.
    pub solution: &'a mut [f64],
    /// `n_cols * n_cols` covariance matrix.
    pub covariance: &'a mut [f64],
    /// `n_rows * n_rows` left singular vectors.
    pub u: &'a mut [f64],
    /// `n_cols * n_cols` right singular vectors.
    pub v: &'a mut [f64],
    /// `min(n_rows, n_cols)` singular values after truncation.
    pub singular_values: &'a mut [f64],
    /// Weighted residual sum of squares.
    pub chi_square: &'a mut f64,
}

impl<'a> FitBuffers<'a> {
    fn check(&self, n_rows: usize, n_cols: usize) -> Result<()> {
        let n_cols_sq = element_count("covariance", n_cols, n_cols)?;
        let n_rows_sq = element_count("left singular vectors", n_rows, n_rows)?;
        for &(what, actual, expected) in &[
            ("solution", self.solution.len(), n_cols),
            ("covariance", self.covariance.len(), n_cols_sq),
            ("left singular vectors", self.u.len(), n_rows_sq),
            ("right singular vectors", self.v.len(), n_cols_sq),
            (
                "singular values",
                self.singular_values.len(),
                n_rows.min(n_cols),
            ),
        ] {
            if actual != expected {
                return Err(FitError::BufferLength {
                    what,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Fit from flat buffers using default options.
///
/// `x` holds `n_rows * n_cols` values in row-major order, `y` and `s` hold
/// `n_rows` values each.  On success every output buffer, including the
/// chi-square, has been written.  On error the output buffers must not be
/// trusted.
pub fn fit_into(
    n_rows: usize,
    n_cols: usize,
    x: &[f64],
    y: &[f64],
    s: &[f64],
    out: FitBuffers<'_>,
) -> Result<()> {
    fit_into_with_options(n_rows, n_cols, x, y, s, out, &FitOptions::default())
}

/// Same as [`fit_into()`] with explicit [`FitOptions`].
pub fn fit_into_with_options(
    n_rows: usize,
    n_cols: usize,
    x: &[f64],
    y: &[f64],
    s: &[f64],
    out: FitBuffers<'_>,
    options: &FitOptions,
) -> Result<()> {
    // Check every output before doing any work so that a bad buffer does not
    // waste a decomposition.
    out.check(n_rows, n_cols)?;
    let x = row_major_to_matrix(x, n_rows, n_cols)?;
    let fitted = fit_with_options(
        &x,
        &ArrayView1::from(y),
        &ArrayView1::from(s),
        options,
    )?;

    out.solution
        .iter_mut()
        .zip(fitted.solution.iter())
        .for_each(|(dst, &src)| *dst = src);
    copy_row_major_into(&fitted.covariance, out.covariance)?;
    copy_row_major_into(&fitted.svd.u, out.u)?;
    copy_row_major_into(&fitted.svd.v, out.v)?;
    out.singular_values
        .iter_mut()
        .zip(fitted.svd.singular_values.iter())
        .for_each(|(dst, &src)| *dst = src);
    *out.chi_square = fitted.chi_square;
    Ok(())
}
