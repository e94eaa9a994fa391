use serde::{Deserialize, Serialize};

use crate::error::{Result, RulError};

/// Dense row-major matrix of `f64`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows * cols != data.len() {
            return Err(RulError::invalid(format!("matrix {rows}x{cols} needs {} values, got {}", rows * cols, data.len())));
        }
        Ok(Self { rows, cols, data })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self { Self { rows, cols, data: vec![0.0; rows * cols] } }

    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, r) in rows.iter().enumerate() {
            if r.len() != cols { return Err(RulError::invalid(format!("row {i} has {} values, expected {cols}", r.len()))); }
            data.extend_from_slice(r);
        }
        Ok(Self { rows: rows.len(), cols, data })
    }

    pub fn shape(&self) -> (usize, usize) { (self.rows, self.cols) }
    pub fn n_rows(&self) -> usize { self.rows }
    pub fn n_cols(&self) -> usize { self.cols }

    pub fn get(&self, row: usize, col: usize) -> f64 { self.data[row * self.cols + col] }
    pub fn set(&mut self, row: usize, col: usize, value: f64) { self.data[row * self.cols + col] = value; }

    pub fn row(&self, row: usize) -> &[f64] { &self.data[row * self.cols..(row + 1) * self.cols] }

    pub fn column(&self, col: usize) -> Vec<f64> { (0..self.rows).map(|r| self.get(r, col)).collect() }

    /// Split off the trailing column, the layout used for `[features.., target]` arrays.
    pub fn split_last_column(&self) -> Result<(Matrix, Vec<f64>)> {
        if self.cols < 2 { return Err(RulError::invalid("need at least one feature and one target column")); }
        let width = self.cols - 1;
        let mut x = Vec::with_capacity(self.rows * width);
        let mut y = Vec::with_capacity(self.rows);
        for r in 0..self.rows {
            let row = self.row(r);
            x.extend_from_slice(&row[..width]);
            y.push(row[width]);
        }
        Ok((Matrix { rows: self.rows, cols: width, data: x }, y))
    }

    /// Append `values` as a new trailing column.
    pub fn with_column(&self, values: &[f64]) -> Result<Matrix> {
        if values.len() != self.rows { return Err(RulError::invalid(format!("column has {} values, matrix has {} rows", values.len(), self.rows))); }
        let mut data = Vec::with_capacity(self.rows * (self.cols + 1));
        for (r, v) in values.iter().enumerate() {
            data.extend_from_slice(self.row(r));
            data.push(*v);
        }
        Ok(Matrix { rows: self.rows, cols: self.cols + 1, data })
    }

    pub fn rows_iter(&self) -> impl Iterator<Item = &[f64]> + '_ { (0..self.rows).map(move |r| self.row(r)) }

    /// Narrow to the `f32` matrix used by `aprender` preprocessing.
    pub fn to_aprender(&self) -> Result<aprender::primitives::Matrix<f32>> {
        let data = self.data.iter().map(|v| *v as f32).collect();
        aprender::primitives::Matrix::from_vec(self.rows, self.cols, data).map_err(RulError::invalid)
    }

    pub fn from_aprender(m: &aprender::primitives::Matrix<f32>) -> Matrix {
        let (rows, cols) = m.shape();
        Matrix { rows, cols, data: m.as_slice().iter().map(|v| f64::from(*v)).collect() }
    }
}
