use aprender::model_selection;
use aprender::primitives::{Matrix, Vector};

use crate::error::{Result, RulError};
use crate::frame::Frame;

/// Row indices travel through `f32`; beyond this they stop being exact.
const MAX_ROWS: usize = 1 << 24;

/// Seeded shuffle split, holding out `round(n * test_size)` rows.
/// Returns `(train, test)`; both keep every column.
///
/// The shuffle is `aprender`'s; it runs over row indices so cell values never
/// leave `f64`.
pub fn train_test_split(frame: &Frame, test_size: f64, seed: u64) -> Result<(Frame, Frame)> {
    let n = frame.height();
    if n > MAX_ROWS { return Err(RulError::invalid(format!("cannot split {n} rows, limit is {MAX_ROWS}"))); }
    let ids: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let x = Matrix::from_vec(n, 1, ids.clone()).map_err(RulError::invalid)?;
    let y = Vector::from_vec(ids);
    let (train, test, _, _) = model_selection::train_test_split(&x, &y, test_size as f32, Some(seed))
        .map_err(|e| RulError::invalid(format!("cannot split {n} rows with test_size {test_size}: {e}")))?;
    Ok((frame.take_rows(&row_ids(&train)), frame.take_rows(&row_ids(&test))))
}

fn row_ids(m: &Matrix<f32>) -> Vec<usize> { m.as_slice().iter().map(|v| *v as usize).collect() }

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: usize) -> Frame {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64, (i * 2) as f64 + 0.125]).collect();
        Frame::from_rows(vec!["a".into(), "b".into()], &rows).unwrap()
    }

    #[test]
    fn sizes_and_disjointness() {
        let (train, test) = train_test_split(&frame(10), 0.2, 42).unwrap();
        assert_eq!((train.height(), test.height()), (8, 2));
        let mut all: Vec<f64> = train.column("a").unwrap().iter().chain(test.column("a").unwrap()).copied().collect();
        all.sort_by(f64::total_cmp);
        assert_eq!(all, (0..10).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn rows_stay_intact() {
        let (train, _) = train_test_split(&frame(30), 0.3, 3).unwrap();
        for (a, b) in train.column("a").unwrap().iter().zip(train.column("b").unwrap()) {
            assert_eq!(*b, a * 2.0 + 0.125);
        }
    }

    #[test]
    fn same_seed_same_split() {
        let f = frame(50);
        let (a, _) = train_test_split(&f, 0.3, 7).unwrap();
        let (b, _) = train_test_split(&f, 0.3, 7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_degenerate_requests() {
        assert!(train_test_split(&frame(1), 0.2, 1).is_err());
        assert!(train_test_split(&frame(10), 1.0, 1).is_err());
        assert!(train_test_split(&frame(10), 0.0, 1).is_err());
    }
}
