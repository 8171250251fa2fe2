//! Truncated singular value decomposition and the minimum-norm least squares
//! solve built on top of it.
//!
//! Given a design matrix `x` (rows are observations, columns are predictors)
//! we compute the full decomposition `x = u * diag(s) * v'` with lapack's
//! divide-and-conquer algorithm (dgesdd).  Singular values that are tiny
//! compared to the largest one carry no information, only noise, so any
//! singular value strictly below `tol * max(s)` is reset to exactly zero.  The
//! reciprocals of the surviving singular values give the Moore-Penrose
//! pseudoinverse
//!
//! ```text
//! pinv(x) = v * diag(s_pinv) * u'
//! ```
//!
//! and `pinv(x) * y` is the least squares solution of `x * a = y` with the
//! smallest Euclidean norm.  This works for tall, fat, square, and rank-
//! deficient matrices alike.

use crate::error::{FitError, Result};
use ndarray::{s, Array1, Array2, ArrayBase, Data, Ix1, Ix2, Zip};
use ndarray_linalg::svddc::{UVTFlag, SVDDC};

/// Default relative tolerance below which singular values are truncated.
pub const DEFAULT_TOL: f64 = 1e-12;

pub(crate) fn check_tolerance(tol: f64) -> Result<()> {
    if tol.is_finite() && (0. ..1.).contains(&tol) {
        Ok(())
    } else {
        Err(FitError::InvalidTolerance(tol))
    }
}

/// Output of the [`TruncatedSvd`] operations.
#[derive(Clone, Debug)]
pub struct TruncatedSvdOutput {
    /// Left singular vectors, `n_rows x n_rows`.
    pub u: Array2<f64>,
    /// Singular values in descending order, `min(n_rows, n_cols)` of them,
    /// with the truncated ones set to exactly zero.
    pub singular_values: Array1<f64>,
    /// Right singular vectors (not transposed), `n_cols x n_cols`.
    pub v: Array2<f64>,
    /// Reciprocal singular values zero-extended to `n_cols` entries.  Zero
    /// wherever the singular value is zero.
    pub sigma_pinv: Array1<f64>,
    /// Number of non-zero singular values after truncation.
    pub rank: usize,
}

impl TruncatedSvdOutput {
    /// Number of observations (rows of the decomposed matrix).
    pub fn nrows(&self) -> usize {
        self.u.nrows()
    }

    /// Number of predictors (columns of the decomposed matrix).
    pub fn ncols(&self) -> usize {
        self.v.nrows()
    }

    /// Minimum-norm least squares solution `a = v * diag(s_pinv) * u' * y`.
    ///
    /// Computed as two matrix-vector products with an element-wise scaling in
    /// between, the diagonal matrix is never formed.
    pub fn solve<S>(&self, y: &ArrayBase<S, Ix1>) -> Result<Array1<f64>>
    where
        S: Data<Elem = f64>,
    {
        if y.len() != self.nrows() {
            return Err(FitError::DimensionMismatch {
                what: "target vector",
                expected: self.nrows(),
                actual: y.len(),
            });
        }
        // Only the first min(n_rows, n_cols) entries of u'y can meet a
        // non-zero reciprocal singular value.
        let k = self.singular_values.len();
        let uty = self.u.t().dot(y);
        let mut scaled = Array1::<f64>::zeros(self.ncols());
        Zip::from(scaled.slice_mut(s![..k]))
            .and(uty.slice(s![..k]))
            .and(self.sigma_pinv.slice(s![..k]))
            .for_each(|w, &b, &sp| *w = sp * b);
        Ok(self.v.dot(&scaled))
    }

    /// The pseudoinverse matrix itself, `n_cols x n_rows`.
    pub fn pinv(&self) -> Array2<f64> {
        let k = self.singular_values.len();
        // Scale the columns of v by broadcasting, then multiply by u'.
        (&self.v.slice(s![.., ..k]) * &self.sigma_pinv.slice(s![..k]))
            .dot(&self.u.slice(s![.., ..k]).t())
    }
}

/// Singular value decomposition with truncation of negligible singular values.
pub trait TruncatedSvd {
    /// Decompose using the default relative tolerance [`DEFAULT_TOL`].
    fn truncated_svd(&self) -> Result<TruncatedSvdOutput>;

    /// Same as [`TruncatedSvd::truncated_svd()`].  Manually specify the
    /// relative tolerance (in `[0, 1)`) below which singular values are
    /// treated as zero.
    fn truncated_svd_with_tol(&self, tol: f64) -> Result<TruncatedSvdOutput>;
}

impl<S> TruncatedSvd for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64>,
{
    fn truncated_svd(&self) -> Result<TruncatedSvdOutput> {
        self.truncated_svd_with_tol(DEFAULT_TOL)
    }

    fn truncated_svd_with_tol(&self, tol: f64) -> Result<TruncatedSvdOutput> {
        check_tolerance(tol)?;
        let (n_rows, n_cols) = self.dim();
        if n_rows == 0 || n_cols == 0 {
            return Err(FitError::EmptyDesign {
                rows: n_rows,
                cols: n_cols,
            });
        }

        // SVDDC wants DataMut, so decompose an owned copy.  We need the full
        // square u and v, not the "economical" ones.
        let a = self.to_owned();
        let (u, mut sigma, vt) = a.svddc(UVTFlag::Full).map_err(|e| {
            log::warn!("svd of {}x{} design matrix failed: {}", n_rows, n_cols, e);
            FitError::from(e)
        })?;
        let u = u.ok_or(FitError::IncompleteDecomposition("left"))?;
        let v = vt
            .ok_or(FitError::IncompleteDecomposition("right"))?
            .reversed_axes();

        // Some lapack builds pass NaN straight through instead of reporting
        // an error.
        if sigma.iter().any(|el| !el.is_finite()) {
            log::warn!(
                "svd of {}x{} design matrix returned non-finite singular values",
                n_rows,
                n_cols
            );
            return Err(FitError::NonFiniteDecomposition);
        }

        // Lapack sorts singular values in descending order, but take the
        // maximum explicitly since the threshold depends on it.
        let smax = sigma.fold(0., |m: f64, &el| m.max(el));
        let threshold = tol * smax;
        let mut truncated = 0;
        sigma.mapv_inplace(|el| {
            if el < threshold {
                if el != 0. {
                    truncated += 1;
                }
                0.
            } else {
                el
            }
        });
        if truncated > 0 {
            log::debug!(
                "truncated {} singular value(s) below {:e} (smax = {:e})",
                truncated,
                threshold,
                smax
            );
        }

        // Take the reciprocal of the surviving singular values.  Indices past
        // the end of `sigma` (more columns than rows) get zero.
        let k = sigma.len();
        let sigma_pinv = Array1::from_shape_fn(n_cols, |j| {
            if j < k && sigma[j] != 0. {
                1. / sigma[j]
            } else {
                0.
            }
        });
        let rank = sigma.iter().filter(|&&el| el != 0.).count();

        Ok(TruncatedSvdOutput {
            u,
            singular_values: sigma,
            v,
            sigma_pinv,
            rank,
        })
    }
}
