//! Refit many local linear functions at once.
//!
//! A piecewise-linear model periodically refits every one of its pieces on
//! the observations routed to it.  The pieces are independent, each fit owns
//! its inputs and produces its own outputs, so they can be solved in parallel
//! on the rayon threadpool.  The threadpool defaults to one thread per CPU;
//! configure it with `rayon::ThreadPoolBuilder` before calling in here if that
//! is not what you want.
//!
//! Which observations belong to which piece is decided by the caller.

use crate::error::{FitError, Result};
use crate::lls::{fit_with_options, FitOptions, LinearFit};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

/// Observations routed to one piece.
#[derive(Clone, Debug)]
pub struct PieceData {
    /// Design matrix, one row per observation.
    pub x: Array2<f64>,
    /// Observed outputs.
    pub y: Array1<f64>,
    /// Per-observation weights.
    pub s: Array1<f64>,
}

impl PieceData {
    /// Gather the given rows of the full training set.
    pub fn select<S1, S2, S3>(
        x: &ArrayBase<S1, Ix2>,
        y: &ArrayBase<S2, Ix1>,
        s: &ArrayBase<S3, Ix1>,
        rows: &[usize],
    ) -> Result<Self>
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
        S3: Data<Elem = f64>,
    {
        let n_rows = x.nrows();
        for &(what, len) in &[("target vector", y.len()), ("weight vector", s.len())] {
            if len != n_rows {
                return Err(FitError::DimensionMismatch {
                    what,
                    expected: n_rows,
                    actual: len,
                });
            }
        }
        // `select()` panics on an out of bounds index, check up front.
        if let Some(&row) = rows.iter().find(|&&row| row >= n_rows) {
            return Err(FitError::DimensionMismatch {
                what: "row index",
                expected: n_rows,
                actual: row,
            });
        }
        Ok(PieceData {
            x: x.select(Axis(0), rows),
            y: y.select(Axis(0), rows),
            s: s.select(Axis(0), rows),
        })
    }

    pub fn fit(&self, options: &FitOptions) -> Result<LinearFit> {
        fit_with_options(&self.x, &self.y, &self.s, options)
    }
}

/// Fit every piece in parallel.
///
/// Results come back in the same order as `pieces`.  A failing piece does not
/// affect the others.
pub fn fit_pieces(pieces: &[PieceData], options: &FitOptions) -> Vec<Result<LinearFit>> {
    let fits: Vec<Result<LinearFit>> = pieces.par_iter().map(|piece| piece.fit(options)).collect();
    let failed = fits.iter().filter(|fit| fit.is_err()).count();
    if failed > 0 {
        log::warn!("{} of {} pieces failed to fit", failed, pieces.len());
    }
    fits
}

#[cfg(test)]
mod test {
    extern crate blas_src;
    use super::*;
    use ndarray::{array, Array};
    use ndarray_rand::RandomExt;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::StandardNormal;

    #[test]
    fn test_select_rows() {
        let x = array![[1., 2.], [3., 4.], [5., 6.]];
        let y = array![10., 20., 30.];
        let s = array![1., 2., 3.];
        let piece = PieceData::select(&x, &y, &s, &[2, 0]).unwrap();
        assert_eq!(piece.x, array![[5., 6.], [1., 2.]]);
        assert_eq!(piece.y, array![30., 10.]);
        assert_eq!(piece.s, array![3., 1.]);
        assert!(matches!(
            PieceData::select(&x, &y, &s, &[0, 3]),
            Err(FitError::DimensionMismatch { what: "row index", actual: 3, .. })
        ));
        assert!(PieceData::select(&x, &array![1.], &s, &[0]).is_err());
    }

    #[test]
    fn test_parallel_matches_serial() {
        // Two linear pieces: the first half of the rows follow one line, the
        // second half another.
        let n = 40;
        let x = {
            let mut x = Array::<f64, _>::random_using((n, 2), StandardNormal, &mut StdRng::seed_from_u64(9));
            x.column_mut(0).fill(1.); // intercept
            x
        };
        let mut y = Array1::<f64>::zeros(n);
        for i in 0..n {
            let b = if i < n / 2 { array![1., 2.] } else { array![-3., 0.5] };
            y[i] = x.row(i).dot(&b);
        }
        let s = Array1::<f64>::ones(n);
        let first: Vec<usize> = (0..n / 2).collect();
        let second: Vec<usize> = (n / 2..n).collect();
        let pieces = vec![
            PieceData::select(&x, &y, &s, &first).unwrap(),
            PieceData::select(&x, &y, &s, &second).unwrap(),
            // Degenerate piece with no observations.
            PieceData {
                x: Array2::zeros((0, 2)),
                y: Array1::zeros(0),
                s: Array1::zeros(0),
            },
        ];
        let options = FitOptions::default();
        let fits = fit_pieces(&pieces, &options);
        assert_eq!(fits.len(), 3);
        let a = fits[0].as_ref().unwrap();
        let b = fits[1].as_ref().unwrap();
        assert!(a.solution.abs_diff_eq(&array![1., 2.], 1e-8));
        assert!(b.solution.abs_diff_eq(&array![-3., 0.5], 1e-8));
        assert!(matches!(fits[2], Err(FitError::EmptyDesign { rows: 0, cols: 2 })));
        // Same answers as fitting one at a time.
        for (piece, fit) in pieces.iter().zip(fits.iter()).take(2) {
            let serial = piece.fit(&options).unwrap();
            let fit = fit.as_ref().unwrap();
            assert_eq!(serial.solution, fit.solution);
            assert_eq!(serial.covariance, fit.covariance);
            assert_eq!(serial.chi_square, fit.chi_square);
        }
    }
}
