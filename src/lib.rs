//! Least squares fitting engine for local linear functions (LFNs).
//!
//! A piecewise-linear model is made of many linear pieces, each one refit from
//! time to time on the observations routed to it.  This crate does the refit:
//!
//! 1. [`marshal`] turns flat row- or column-major buffers into matrices and
//!    back.
//! 2. [`pseudoinverse`] decomposes the design matrix, truncates negligible
//!    singular values, and solves for the minimum-norm least squares
//!    parameters.
//! 3. [`diagnostics`] computes the weighted residual sum of squares and the
//!    parameter covariance matrix.
//!
//! [`lls`] wires the three together, [`batch`] refits many pieces in parallel.
//!
//! ```no_run
//! # extern crate blas_src;
//! use ndarray::array;
//! use lfn_fit::fit;
//!
//! let x = array![[1., 0.], [1., 1.], [1., 2.]];
//! let y = array![1., 3., 5.];
//! let s = array![1., 1., 1.];
//! let fitted = fit(&x, &y, &s).unwrap();
//! println!("a = {}, chi-square = {}", fitted.solution, fitted.chi_square);
//! ```
//!
//! The singular value decomposition comes from lapack through ndarray-linalg.
//! This crate does not pick a blas/lapack backend, link one in your binary
//! (see the comments in Cargo.toml).

pub mod batch;
pub mod diagnostics;
pub mod error;
pub mod lls;
pub mod marshal;
pub mod pseudoinverse;

pub use batch::{fit_pieces, PieceData};
pub use error::{FitError, Result};
pub use lls::{fit, fit_into, fit_into_with_options, fit_with_options, FitBuffers, FitOptions, LinearFit};
pub use pseudoinverse::{TruncatedSvd, TruncatedSvdOutput, DEFAULT_TOL};
