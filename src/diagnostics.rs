//! Quantities an external statistics layer needs to judge a fit.
//!
//! Neither function here draws conclusions.  The covariance matrix is only
//! known up to the noise variance; multiply it by `chi_square / df` (with
//! `df = n_rows - n_cols`) to get parameter variances in natural units.

use crate::error::{FitError, Result};
use ndarray::{Array1, Array2, ArrayBase, Data, Ix1, Ix2, Zip};

/// Weighted residual sum of squares
///
/// ```text
/// chi_square = sum_i ((y[i] - x[i, :] . a) / s[i])^2
/// ```
///
/// The model is re-evaluated against the original data rather than derived
/// from the decomposition, so an inconsistent solution shows up here.
pub fn chi_square<S1, S2, S3, S4>(
    x: &ArrayBase<S1, Ix2>,
    y: &ArrayBase<S2, Ix1>,
    s: &ArrayBase<S3, Ix1>,
    a: &ArrayBase<S4, Ix1>,
) -> Result<f64>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
    S3: Data<Elem = f64>,
    S4: Data<Elem = f64>,
{
    let (n_rows, n_cols) = x.dim();
    for &(what, len, expected) in &[
        ("target vector", y.len(), n_rows),
        ("weight vector", s.len(), n_rows),
        ("solution vector", a.len(), n_cols),
    ] {
        if len != expected {
            return Err(FitError::DimensionMismatch {
                what,
                expected,
                actual: len,
            });
        }
    }
    let yhat = x.dot(a); // predicted y
    Ok(Zip::from(y)
        .and(&yhat)
        .and(s)
        .fold(0., |chisq, &y, &yhat, &s| {
            let resid = (y - yhat) / s; // weighted residual
            chisq + resid * resid
        }))
}

/// Parameter covariance matrix (up to the noise variance)
///
/// ```text
/// c[i, k] = c[k, i] = sum_j v[k, j] * v[i, j] * s_pinv[j]^2
/// ```
///
/// Only the upper triangle is computed.  Each entry is copied to its mirror
/// position, so the result is exactly symmetric.
pub fn covariance<S1, S2>(
    v: &ArrayBase<S1, Ix2>,
    sigma_pinv: &ArrayBase<S2, Ix1>,
) -> Result<Array2<f64>>
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    let n = v.nrows();
    if v.ncols() != n {
        return Err(FitError::DimensionMismatch {
            what: "right singular vectors",
            expected: n,
            actual: v.ncols(),
        });
    }
    if sigma_pinv.len() != n {
        return Err(FitError::DimensionMismatch {
            what: "reciprocal singular values",
            expected: n,
            actual: sigma_pinv.len(),
        });
    }
    let wti: Array1<f64> = sigma_pinv.mapv(|el| el * el);
    let mut cvm = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        let vi = v.row(i);
        for k in i..n {
            let sum = Zip::from(v.row(k))
                .and(&vi)
                .and(&wti)
                .fold(0., |sum, &vk, &vi, &w| sum + vk * vi * w);
            cvm[[i, k]] = sum;
            cvm[[k, i]] = sum;
        }
    }
    Ok(cvm)
}
