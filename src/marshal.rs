//! Conversion between flat buffers and two-dimensional matrices.
//!
//! Callers of the fitting engine hand over plain `&[f64]` slices.  Depending
//! on where the data came from the slice is laid out either row by row
//! (row-major, "C order") or column by column (column-major, "Fortran order").
//! For a `rows` x `cols` matrix:
//!
//! ```text
//! row-major:    element (r, c) = flat[r * cols + c]
//! column-major: element (r, c) = flat[c * rows + r]
//! ```
//!
//! Unlike a raw pointer interface the length of every buffer is checked
//! against the declared dimensions and a mismatch is reported as
//! [`FitError::BufferLength`].

use crate::error::{FitError, Result};
use ndarray::{Array, Array2, ArrayBase, Data, Ix2, ShapeBuilder};

/// Number of elements in a `rows` x `cols` matrix, or an error if that does
/// not fit in a `usize`.
pub(crate) fn element_count(what: &'static str, rows: usize, cols: usize) -> Result<usize> {
    rows.checked_mul(cols)
        .ok_or(FitError::DimensionOverflow { what, rows, cols })
}

fn check_len(what: &'static str, actual: usize, rows: usize, cols: usize) -> Result<()> {
    let expected = element_count(what, rows, cols)?;
    if actual != expected {
        return Err(FitError::BufferLength {
            what,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Build a `rows` x `cols` matrix from a row-major buffer.
pub fn row_major_to_matrix(flat: &[f64], rows: usize, cols: usize) -> Result<Array2<f64>> {
    check_len("row-major input", flat.len(), rows, cols)?;
    Ok(Array::from_shape_vec((rows, cols), flat.to_vec())?)
}

/// Build a `rows` x `cols` matrix from a column-major buffer.
///
/// The returned array keeps the column-major memory layout, which ndarray
/// handles transparently.
pub fn col_major_to_matrix(flat: &[f64], rows: usize, cols: usize) -> Result<Array2<f64>> {
    check_len("column-major input", flat.len(), rows, cols)?;
    Ok(Array::from_shape_vec((rows, cols).f(), flat.to_vec())?)
}

/// Flatten a matrix row by row.
///
/// Iteration over an ndarray always follows logical row-major order, whatever
/// the memory layout of `matrix` happens to be.
pub fn matrix_to_row_major<S>(matrix: &ArrayBase<S, Ix2>) -> Vec<f64>
where
    S: Data<Elem = f64>,
{
    matrix.iter().copied().collect()
}

/// Flatten a matrix column by column.
pub fn matrix_to_col_major<S>(matrix: &ArrayBase<S, Ix2>) -> Vec<f64>
where
    S: Data<Elem = f64>,
{
    matrix.t().iter().copied().collect()
}

/// Write a matrix row by row into a caller-owned buffer.
pub fn copy_row_major_into<S>(matrix: &ArrayBase<S, Ix2>, out: &mut [f64]) -> Result<()>
where
    S: Data<Elem = f64>,
{
    check_len("row-major output", out.len(), matrix.nrows(), matrix.ncols())?;
    out.iter_mut()
        .zip(matrix.iter())
        .for_each(|(dst, &src)| *dst = src);
    Ok(())
}

/// Write a matrix column by column into a caller-owned buffer.
pub fn copy_col_major_into<S>(matrix: &ArrayBase<S, Ix2>, out: &mut [f64]) -> Result<()>
where
    S: Data<Elem = f64>,
{
    check_len("column-major output", out.len(), matrix.nrows(), matrix.ncols())?;
    out.iter_mut()
        .zip(matrix.t().iter())
        .for_each(|(dst, &src)| *dst = src);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_row_major_layout() {
        let flat = [1., 2., 3., 4., 5., 6.];
        let mat = row_major_to_matrix(&flat, 2, 3).unwrap();
        assert_eq!(mat, array![[1., 2., 3.], [4., 5., 6.]]);
        // element (r, c) = flat[r * cols + c]
        assert_eq!(mat[[1, 0]], flat[3]);
        assert_eq!(matrix_to_row_major(&mat), flat.to_vec());
    }

    #[test]
    fn test_col_major_layout() {
        let flat = [1., 2., 3., 4., 5., 6.];
        let mat = col_major_to_matrix(&flat, 2, 3).unwrap();
        assert_eq!(mat, array![[1., 3., 5.], [2., 4., 6.]]);
        // element (r, c) = flat[c * rows + r]
        assert_eq!(mat[[1, 2]], flat[2 * 2 + 1]);
        assert_eq!(matrix_to_col_major(&mat), flat.to_vec());
        // The same matrix flattened the other way around.
        assert_eq!(matrix_to_row_major(&mat), vec![1., 3., 5., 2., 4., 6.]);
    }

    #[test]
    fn test_copy_into_buffers() {
        let mat = array![[1., 2.], [3., 4.], [5., 6.]];
        let mut rm = [0.; 6];
        copy_row_major_into(&mat, &mut rm).unwrap();
        assert_eq!(rm, [1., 2., 3., 4., 5., 6.]);
        let mut cm = [0.; 6];
        copy_col_major_into(&mat, &mut cm).unwrap();
        assert_eq!(cm, [1., 3., 5., 2., 4., 6.]);
        // Transposed views work too.
        copy_row_major_into(&mat.t(), &mut rm).unwrap();
        assert_eq!(rm, [1., 3., 5., 2., 4., 6.]);
    }

    #[test]
    fn test_empty_dimensions() {
        let mat = row_major_to_matrix(&[], 0, 4).unwrap();
        assert_eq!(mat.dim(), (0, 4));
        assert!(matrix_to_row_major(&mat).is_empty());
        let mat = col_major_to_matrix(&[], 3, 0).unwrap();
        assert_eq!(mat.dim(), (3, 0));
    }

    #[test]
    fn test_length_mismatch() {
        match row_major_to_matrix(&[1., 2., 3.], 2, 2) {
            Err(FitError::BufferLength { expected: 4, actual: 3, .. }) => (),
            other => panic!("unexpected result: {:?}", other),
        }
        let mat = array![[1., 2.], [3., 4.]];
        let mut out = [0.; 5];
        assert!(copy_col_major_into(&mat, &mut out).is_err());
        // The buffer must not have been touched.
        assert_eq!(out, [0.; 5]);
    }

    #[test]
    fn test_dimension_overflow() {
        // rows * cols wraps around to 0 in release builds, which must not
        // let an empty buffer through.
        let rows = usize::MAX / 2 + 1;
        match row_major_to_matrix(&[], rows, 2) {
            Err(FitError::DimensionOverflow { rows: r, cols: 2, .. }) => assert_eq!(r, rows),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            col_major_to_matrix(&[], 2, rows),
            Err(FitError::DimensionOverflow { .. })
        ));
        assert_eq!(element_count("test", 3, 4).unwrap(), 12);
    }
}
