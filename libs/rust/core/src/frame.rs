//! Minimal numeric column frame used between pipeline stages.
//!
//! Every cell is an `f64`; a missing reading is `NaN`. CSV cells holding the
//! sentinel `na` (or nothing at all) load as missing and are written back as
//! empty cells.
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, RulError};
use crate::ml::Matrix;

/// Tokens treated as a missing reading.
pub const MISSING_TOKENS: [&str; 4] = ["", "na", "nan", "NaN"];

pub fn parse_cell(raw: &str) -> Option<Option<f64>> {
    let t = raw.trim();
    if MISSING_TOKENS.contains(&t) { return Some(None); }
    t.parse::<f64>().ok().map(Some)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    data: Vec<Vec<f64>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, data: Vec<Vec<f64>>) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(RulError::invalid(format!("{} column names for {} columns", columns.len(), data.len())));
        }
        if let Some(first) = data.first() {
            if let Some((i, c)) = data.iter().enumerate().find(|(_, c)| c.len() != first.len()) {
                return Err(RulError::invalid(format!("column `{}` has {} rows, expected {}", columns[i], c.len(), first.len())));
            }
        }
        Ok(Self { columns, data })
    }

    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let mut data = vec![Vec::with_capacity(rows.len()); columns.len()];
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(RulError::invalid(format!("row {i} has {} cells, expected {}", row.len(), columns.len())));
            }
            for (col, v) in data.iter_mut().zip(row) { col.push(*v); }
        }
        Ok(Self { columns, data })
    }

    pub fn height(&self) -> usize { self.data.first().map(|c| c.len()).unwrap_or(0) }
    pub fn width(&self) -> usize { self.columns.len() }
    pub fn is_empty(&self) -> bool { self.columns.is_empty() }
    pub fn columns(&self) -> &[String] { &self.columns }
    pub fn has_column(&self, name: &str) -> bool { self.column_index(name).is_some() }
    pub fn column_index(&self, name: &str) -> Option<usize> { self.columns.iter().position(|c| c == name) }
    pub fn column(&self, name: &str) -> Option<&[f64]> { self.column_index(name).map(|i| self.data[i].as_slice()) }

    pub fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name).ok_or_else(|| RulError::SchemaMismatch(format!("required column `{name}` is missing")))
    }

    pub fn row(&self, i: usize) -> Vec<f64> { self.data.iter().map(|c| c[i]).collect() }

    /// Append a column, replacing an existing one with the same name.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if !self.is_empty() && values.len() != self.height() {
            return Err(RulError::invalid(format!("column `{name}` has {} rows, frame has {}", values.len(), self.height())));
        }
        match self.column_index(name) {
            Some(i) => self.data[i] = values,
            None => { self.columns.push(name.to_string()); self.data.push(values); }
        }
        Ok(())
    }

    /// Drop the named columns that exist; returns the names actually removed.
    pub fn drop_columns<S: AsRef<str>>(&mut self, names: &[S]) -> Vec<String> {
        let mut dropped = Vec::new();
        for n in names {
            if let Some(i) = self.column_index(n.as_ref()) {
                dropped.push(self.columns.remove(i));
                self.data.remove(i);
            }
        }
        dropped
    }

    /// New frame holding `names` in that order; any absent column is a schema mismatch.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Frame> {
        let missing: Vec<&str> = names.iter().map(|n| n.as_ref()).filter(|n| !self.has_column(n)).collect();
        if !missing.is_empty() {
            return Err(RulError::SchemaMismatch(format!("columns {missing:?} not found in {:?}", self.columns)));
        }
        let mut columns = Vec::with_capacity(names.len());
        let mut data = Vec::with_capacity(names.len());
        for n in names {
            let n = n.as_ref();
            columns.push(n.to_string());
            data.push(self.column(n).map(|c| c.to_vec()).unwrap_or_default());
        }
        Ok(Frame { columns, data })
    }

    pub fn take_rows(&self, idx: &[usize]) -> Frame {
        Frame { columns: self.columns.clone(), data: self.data.iter().map(|c| idx.iter().map(|&i| c[i]).collect()).collect() }
    }

    /// Fraction of missing cells per column, in column order.
    pub fn missing_fraction(&self) -> Vec<(String, f64)> {
        let h = self.height().max(1) as f64;
        self.columns.iter().zip(&self.data).map(|(n, c)| (n.clone(), c.iter().filter(|v| v.is_nan()).count() as f64 / h)).collect()
    }

    pub fn to_matrix(&self) -> Matrix {
        let (h, w) = (self.height(), self.width());
        let mut m = Matrix::zeros(h, w);
        for (j, col) in self.data.iter().enumerate() {
            for (i, v) in col.iter().enumerate() { m.set(i, j, *v); }
        }
        m
    }

    pub fn from_matrix(columns: Vec<String>, m: &Matrix) -> Result<Frame> {
        if columns.len() != m.n_cols() {
            return Err(RulError::invalid(format!("{} names for {} matrix columns", columns.len(), m.n_cols())));
        }
        let data = (0..m.n_cols()).map(|j| m.column(j)).collect();
        Ok(Frame { columns, data })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Frame> {
        let path = path.as_ref();
        if !path.exists() { return Err(RulError::ArtifactNotFound(path.to_path_buf())); }
        let mut reader = csv::ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut data = vec![Vec::new(); columns.len()];
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            for (j, col) in data.iter_mut().enumerate() {
                let raw = record.get(j).unwrap_or("");
                match parse_cell(raw) {
                    Some(v) => col.push(v.unwrap_or(f64::NAN)),
                    None => return Err(RulError::invalid(format!("{}: row {} column `{}` is not numeric: {raw:?}", path.display(), line + 1, columns[j]))),
                }
            }
        }
        let frame = Frame { columns, data };
        debug!(path = %path.display(), rows = frame.height(), cols = frame.width(), "csv loaded");
        Ok(frame)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() { fs::create_dir_all(dir).map_err(|e| RulError::io(dir, e))?; }
        }
        let mut w = csv::Writer::from_path(path)?;
        w.write_record(&self.columns)?;
        for i in 0..self.height() {
            w.write_record(self.data.iter().map(|c| if c[i].is_nan() { String::new() } else { c[i].to_string() }))?;
        }
        w.flush().map_err(|e| RulError::io(path, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::from_rows(vec!["a".into(), "b".into(), "c".into()], &[vec![1.0, f64::NAN, 3.0], vec![4.0, f64::NAN, 6.0], vec![7.0, 8.0, 9.0]]).unwrap()
    }

    #[test]
    fn csv_keeps_missing_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/f.csv");
        let f = sample();
        f.write_csv(&path).unwrap();
        let back = Frame::read_csv(&path).unwrap();
        assert_eq!(back.columns(), f.columns());
        assert_eq!(back.column("a").unwrap(), &[1.0, 4.0, 7.0]);
        assert!(back.column("b").unwrap()[0].is_nan());
        assert_eq!(back.column("b").unwrap()[2], 8.0);
    }

    #[test]
    fn na_sentinel_reads_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "x,y\n1,na\n2,3.5\n").unwrap();
        let f = Frame::read_csv(&path).unwrap();
        assert!(f.column("y").unwrap()[0].is_nan());
        assert_eq!(f.missing_fraction()[1].1, 0.5);
    }

    #[test]
    fn non_numeric_cell_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "x\nabc\n").unwrap();
        assert!(matches!(Frame::read_csv(&path), Err(RulError::InvalidData(_))));
        assert!(matches!(Frame::read_csv(dir.path().join("absent.csv")), Err(RulError::ArtifactNotFound(_))));
    }

    #[test]
    fn select_reports_missing_columns() {
        let f = sample();
        assert_eq!(f.select(&["c", "a"]).unwrap().columns(), &["c".to_string(), "a".to_string()]);
        assert!(matches!(f.select(&["z"]), Err(RulError::SchemaMismatch(_))));
    }

    #[test]
    fn drop_ignores_absent_names() {
        let mut f = sample();
        let dropped = f.drop_columns(&["b", "zz"]);
        assert_eq!(dropped, vec!["b".to_string()]);
        assert_eq!(f.width(), 2);
    }
}
