use aprender::metrics::r_squared;
use aprender::primitives::Vector;

use crate::error::{Result, RulError};

/// Coefficient of determination, via `aprender` in `f32`.
///
/// A constant `y_true` scores 0.0 whatever the predictions.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    if y_true.len() != y_pred.len() {
        return Err(RulError::invalid(format!("{} targets but {} predictions", y_true.len(), y_pred.len())));
    }
    if y_true.is_empty() { return Err(RulError::invalid("cannot score an empty sample")); }
    Ok(f64::from(r_squared(&narrow(y_pred), &narrow(y_true))))
}

fn narrow(values: &[f64]) -> Vector<f32> { Vector::from_vec(values.iter().map(|v| *v as f32).collect()) }
