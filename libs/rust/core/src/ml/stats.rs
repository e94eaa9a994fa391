//! Two-sample Kolmogorov-Smirnov test used for drift detection.
use serde::{Deserialize, Serialize};

use crate::error::{Result, RulError};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KsResult {
    pub statistic: f64,
    pub pvalue: f64,
}

/// Two-sided KS test. Missing values are dropped first; the p-value uses the
/// asymptotic Kolmogorov distribution with the Stephens small-sample correction.
pub fn ks_2samp(a: &[f64], b: &[f64]) -> Result<KsResult> {
    let mut a: Vec<f64> = a.iter().copied().filter(|v| !v.is_nan()).collect();
    let mut b: Vec<f64> = b.iter().copied().filter(|v| !v.is_nan()).collect();
    if a.is_empty() || b.is_empty() {
        return Err(RulError::invalid("ks test needs two non-empty samples"));
    }
    a.sort_by(f64::total_cmp);
    b.sort_by(f64::total_cmp);
    let (n, m) = (a.len() as f64, b.len() as f64);
    let (mut i, mut j, mut d) = (0usize, 0usize, 0.0f64);
    while i < a.len() && j < b.len() {
        let x = a[i].min(b[j]);
        while i < a.len() && a[i] <= x { i += 1; }
        while j < b.len() && b[j] <= x { j += 1; }
        d = d.max((i as f64 / n - j as f64 / m).abs());
    }
    let en = (n * m / (n + m)).sqrt();
    let pvalue = kolmogorov_survival((en + 0.12 + 0.11 / en) * d);
    Ok(KsResult { statistic: d, pvalue })
}

fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda < 1e-3 { return 1.0; }
    let a2 = -2.0 * lambda * lambda;
    let (mut sum, mut sign, mut prev) = (0.0, 2.0, 0.0f64);
    for j in 1..=100 {
        let j = j as f64;
        let term = sign * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= 1e-3 * prev || term.abs() <= 1e-8 * sum.abs() { return sum.clamp(0.0, 1.0); }
        sign = -sign;
        prev = term.abs();
    }
    1.0
}
