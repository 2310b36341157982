//! Conversions between `ndarray` containers (the public data types) and
//! `nalgebra` matrices (used for the dense solves).

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, Array2};

pub fn ndarray_to_nalgebra(arr: &Array2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(arr.nrows(), arr.ncols(), |i, j| arr[[i, j]])
}

pub fn nalgebra_to_ndarray(mat: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

pub fn ndarray_vec_to_nalgebra(arr: &Array1<f64>) -> DVector<f64> {
    DVector::from_iterator(arr.len(), arr.iter().copied())
}

pub fn nalgebra_vec_to_ndarray(vec: &DVector<f64>) -> Array1<f64> {
    vec.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_matrix_layout_preserved() {
        let arr = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let mat = ndarray_to_nalgebra(&arr);
        assert_eq!(mat.nrows(), 2);
        assert_eq!(mat[(1, 0)], 4.0);
        assert_eq!(nalgebra_to_ndarray(&mat), arr);
    }

    #[test]
    fn test_empty_vector() {
        let v: Array1<f64> = Array1::zeros(0);
        assert_eq!(ndarray_vec_to_nalgebra(&v).len(), 0);
        assert_eq!(nalgebra_vec_to_ndarray(&DVector::zeros(2)), array![0.0, 0.0]);
    }
}
