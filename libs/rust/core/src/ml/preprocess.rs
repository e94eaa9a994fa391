//! Imputation and the fitted feature transformer persisted next to every
//! model. Min-max scaling is `aprender`'s, which works in `f32`.
use aprender::preprocessing::MinMaxScaler;
use aprender::traits::Transformer;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RulError};
use crate::frame::Frame;
use crate::ml::Matrix;

/// Replaces missing values with a constant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleImputer {
    fill_value: f64,
    n_features: Option<usize>,
}

impl SimpleImputer {
    pub fn new(fill_value: f64) -> Self { Self { fill_value, n_features: None } }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.n_rows() == 0 { return Err(RulError::invalid("cannot fit imputer with zero samples")); }
        self.n_features = Some(x.n_cols());
        Ok(())
    }

    pub fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let expected = self.n_features.ok_or_else(|| RulError::invalid("imputer not fitted"))?;
        if x.n_cols() != expected { return Err(RulError::invalid(format!("imputer fitted on {expected} features, got {}", x.n_cols()))); }
        let mut out = x.clone();
        for r in 0..x.n_rows() {
            for c in 0..x.n_cols() {
                if out.get(r, c).is_nan() { out.set(r, c, self.fill_value); }
            }
        }
        Ok(out)
    }
}

/// Imputer + scaler fitted jointly over the feature columns followed by the
/// target column. Records the column names it was fitted on so callers can
/// detect schema drift before scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTransformer {
    feature_names: Vec<String>,
    target_name: String,
    imputer: SimpleImputer,
    scaler: MinMaxScaler,
}

impl FeatureTransformer {
    /// Fit on `frame`; every column other than `target` becomes a feature.
    pub fn fit(frame: &Frame, target: &str, fill_value: f64) -> Result<Self> {
        frame.require_column(target)?;
        let feature_names: Vec<String> = frame.columns().iter().filter(|c| c.as_str() != target).cloned().collect();
        if feature_names.is_empty() { return Err(RulError::SchemaMismatch("no feature columns left to fit".into())); }
        let mut ordered = feature_names.clone();
        ordered.push(target.to_string());
        let x = frame.select(&ordered)?.to_matrix();
        let mut imputer = SimpleImputer::new(fill_value);
        imputer.fit(&x)?;
        let filled = imputer.transform(&x)?;
        let mut scaler = MinMaxScaler::new();
        scaler.fit(&filled.to_aprender()?)?;
        Ok(Self { feature_names, target_name: target.to_string(), imputer, scaler })
    }

    pub fn feature_names(&self) -> &[String] { &self.feature_names }
    pub fn target_name(&self) -> &str { &self.target_name }
    pub fn n_features(&self) -> usize { self.feature_names.len() }

    /// Fail with `SchemaMismatch` unless every fitted feature is present in `frame`.
    pub fn check_schema(&self, frame: &Frame) -> Result<()> {
        let missing: Vec<&String> = self.feature_names.iter().filter(|n| !frame.has_column(n)).collect();
        if missing.is_empty() { return Ok(()); }
        Err(RulError::SchemaMismatch(format!("transformer expects features {missing:?} absent from input columns {:?}", frame.columns())))
    }

    /// Transform `[features.., target]`; the frame must carry the target.
    pub fn transform(&self, frame: &Frame) -> Result<Matrix> {
        self.check_schema(frame)?;
        frame.require_column(&self.target_name)?;
        let mut ordered = self.feature_names.clone();
        ordered.push(self.target_name.clone());
        let x = frame.select(&ordered)?.to_matrix();
        self.scale(&self.imputer.transform(&x)?)
    }

    fn scale(&self, x: &Matrix) -> Result<Matrix> {
        Ok(Matrix::from_aprender(&self.scaler.transform(&x.to_aprender()?)?))
    }

    /// Transform the feature columns only; the target may be absent.
    pub fn transform_features(&self, frame: &Frame) -> Result<Matrix> {
        self.check_schema(frame)?;
        let x = frame.select(&self.feature_names)?.to_matrix();
        // The scaler was fitted with the target as the trailing column.
        let padded = x.with_column(&vec![0.0; x.n_rows()])?;
        let (features, _) = self.scale(&self.imputer.transform(&padded)?)?.split_last_column()?;
        Ok(features)
    }

    /// Undo scaling on `[features.., target]` rows.
    pub fn inverse_transform(&self, x: &Matrix) -> Result<Matrix> {
        if x.n_cols() != self.n_features() + 1 {
            return Err(RulError::invalid(format!("inverse transform expects {} columns, got {}", self.n_features() + 1, x.n_cols())));
        }
        Ok(Matrix::from_aprender(&self.scaler.inverse_transform(&x.to_aprender()?)?))
    }

    /// Map scaled target values back to cycles.
    pub fn inverse_target(&self, scaled: &[f64]) -> Result<Vec<f64>> {
        let rows = Matrix::zeros(scaled.len(), self.n_features()).with_column(scaled)?;
        Ok(self.inverse_transform(&rows)?.column(self.n_features()))
    }

    pub fn output_columns(&self) -> Vec<String> {
        let mut cols = self.feature_names.clone();
        cols.push(self.target_name.clone());
        cols
    }
}
