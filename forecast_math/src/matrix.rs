//! Dense row-major matrices sized for regression design matrices

use crate::{MathError, Result};

/// A dense, row-major matrix of `f64`
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Create a zero-filled matrix
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Create a matrix from a flat row-major buffer
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(MathError::DimensionMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Create a matrix from a list of equally sized rows
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            if row.len() != cols {
                return Err(MathError::DimensionMismatch {
                    expected: cols,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Value at `(row, col)`
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Overwrite the value at `(row, col)`
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    /// Borrow one row
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Concatenate columns of `self` and `other`
    pub fn hstack(&self, other: &Matrix) -> Result<Matrix> {
        if self.cols == 0 {
            return Ok(other.clone());
        }
        if other.cols == 0 {
            return Ok(self.clone());
        }
        if self.rows != other.rows {
            return Err(MathError::DimensionMismatch {
                expected: self.rows,
                actual: other.rows,
            });
        }

        let cols = self.cols + other.cols;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(self.row(r));
            data.extend_from_slice(other.row(r));
        }
        Ok(Matrix {
            rows: self.rows,
            cols,
            data,
        })
    }

    /// Compute `self * beta`
    pub fn mul_vec(&self, beta: &[f64]) -> Result<Vec<f64>> {
        if beta.len() != self.cols {
            return Err(MathError::DimensionMismatch {
                expected: self.cols,
                actual: beta.len(),
            });
        }
        Ok((0..self.rows)
            .map(|r| dot(self.row(r), beta))
            .collect())
    }

    /// Compute the Gram matrix `X^T X`
    pub fn gram(&self) -> Matrix {
        let mut out = Matrix::zeros(self.cols, self.cols);
        for r in 0..self.rows {
            let row = self.row(r);
            for i in 0..self.cols {
                if row[i] == 0.0 {
                    continue;
                }
                for j in i..self.cols {
                    out.data[i * self.cols + j] += row[i] * row[j];
                }
            }
        }
        // mirror the upper triangle
        for i in 0..self.cols {
            for j in 0..i {
                out.data[i * self.cols + j] = out.data[j * self.cols + i];
            }
        }
        out
    }

    /// Compute `X^T y`
    pub fn transpose_mul_vec(&self, y: &[f64]) -> Result<Vec<f64>> {
        if y.len() != self.rows {
            return Err(MathError::DimensionMismatch {
                expected: self.rows,
                actual: y.len(),
            });
        }
        let mut out = vec![0.0; self.cols];
        for (r, &value) in y.iter().enumerate() {
            for (acc, x) in out.iter_mut().zip(self.row(r)) {
                *acc += x * value;
            }
        }
        Ok(out)
    }

    /// Slice out a contiguous range of columns
    pub fn columns(&self, start: usize, end: usize) -> Result<Matrix> {
        if start > end || end > self.cols {
            return Err(MathError::InvalidInput(format!(
                "Column range {}..{} out of bounds for {} columns",
                start, end, self.cols
            )));
        }
        let cols = end - start;
        let mut data = Vec::with_capacity(self.rows * cols);
        for r in 0..self.rows {
            data.extend_from_slice(&self.row(r)[start..end]);
        }
        Ok(Matrix {
            rows: self.rows,
            cols,
            data,
        })
    }
}

/// Inner product of two equally sized slices
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Solve `A x = b` for a symmetric positive definite `A` via Cholesky decomposition
pub fn cholesky_solve(a: &Matrix, b: &[f64]) -> Result<Vec<f64>> {
    let n = a.rows();
    if a.cols() != n {
        return Err(MathError::DimensionMismatch {
            expected: n,
            actual: a.cols(),
        });
    }
    if b.len() != n {
        return Err(MathError::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }

    // lower triangular factor L with A = L L^T
    let mut l = Matrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a.get(i, j);
            for k in 0..j {
                sum -= l.get(i, k) * l.get(j, k);
            }
            if i == j {
                if sum <= 0.0 || !sum.is_finite() {
                    return Err(MathError::CalculationError(format!(
                        "Matrix is not positive definite (pivot {} = {})",
                        i, sum
                    )));
                }
                l.set(i, i, sum.sqrt());
            } else {
                l.set(i, j, sum / l.get(j, j));
            }
        }
    }

    // forward substitution: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l.get(i, k) * z[k];
        }
        z[i] = sum / l.get(i, i);
    }

    // back substitution: L^T x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l.get(k, i) * x[k];
        }
        x[i] = sum / l.get(i, i);
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let result = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(MathError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_gram_and_transpose_product() {
        let x = Matrix::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let g = x.gram();
        assert_eq!(g.get(0, 0), 35.0);
        assert_eq!(g.get(0, 1), 44.0);
        assert_eq!(g.get(1, 0), 44.0);
        assert_eq!(g.get(1, 1), 56.0);

        let xty = x.transpose_mul_vec(&[1.0, 1.0, 1.0]).unwrap();
        assert_eq!(xty, vec![9.0, 12.0]);
    }

    #[test]
    fn test_hstack_and_columns() {
        let a = Matrix::from_rows(&[vec![1.0], vec![2.0]]).unwrap();
        let b = Matrix::from_rows(&[vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        let c = a.hstack(&b).unwrap();
        assert_eq!(c.cols(), 3);
        assert_eq!(c.row(1), &[2.0, 5.0, 6.0]);

        let tail = c.columns(1, 3).unwrap();
        assert_eq!(tail, b);

        let empty = Matrix::zeros(2, 0);
        assert_eq!(empty.hstack(&b).unwrap(), b);
    }

    #[test]
    fn test_cholesky_solve() {
        let a = Matrix::from_rows(&[vec![4.0, 2.0], vec![2.0, 3.0]]).unwrap();
        let x = cholesky_solve(&a, &[2.0, 1.0]).unwrap();
        // 4x + 2y = 2, 2x + 3y = 1  =>  x = 0.5, y = 0
        assert_relative_eq!(x[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_singular_matrix() {
        let a = Matrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert!(matches!(
            cholesky_solve(&a, &[1.0, 1.0]),
            Err(MathError::CalculationError(_))
        ));
    }
}
