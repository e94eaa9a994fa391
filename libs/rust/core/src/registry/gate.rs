//! Promotion gate: a candidate replaces the latest registered model only when
//! it scores strictly better on the same held-out frame.
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::ModelResolver;
use crate::error::{Result, RulError};
use crate::frame::Frame;
use crate::ml::metrics::r2_score;
use crate::ml::{FeatureTransformer, Regressor};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub accepted: bool,
    /// Candidate score minus latest score; `None` when no model was registered.
    pub improvement: Option<f64>,
}

/// Accept iff there is no latest score or `candidate > latest`.
pub fn decide(candidate: f64, latest: Option<f64>) -> Result<EvaluationResult> {
    match latest {
        None => Ok(EvaluationResult { accepted: true, improvement: None }),
        Some(latest) if candidate > latest => Ok(EvaluationResult { accepted: true, improvement: Some(candidate - latest) }),
        Some(latest) => Err(RulError::ModelRejected { candidate, latest }),
    }
}

/// R² in target units: transform the features, predict, map predictions back
/// through `transformer` and compare with `y_true`.
pub fn score<M: Regressor + ?Sized>(model: &M, transformer: &FeatureTransformer, features: &Frame, y_true: &[f64]) -> Result<f64> {
    let x = transformer.transform_features(features)?;
    let scaled = model.predict(&x)?;
    let y_pred = transformer.inverse_target(&scaled)?;
    r2_score(y_true, &y_pred)
}

pub struct PromotionGate<'a> {
    resolver: &'a ModelResolver,
    target: String,
}

impl<'a> PromotionGate<'a> {
    pub fn new(resolver: &'a ModelResolver, target: impl Into<String>) -> Self { Self { resolver, target: target.into() } }

    /// `held_out` must carry the target column plus every feature either transformer expects.
    #[instrument(skip_all, fields(rows = held_out.height()))]
    pub fn evaluate<M: Regressor + ?Sized>(&self, candidate_model: &M, candidate_transformer: &FeatureTransformer, held_out: &Frame) -> Result<EvaluationResult> {
        let Some(latest) = self.resolver.load_latest()? else {
            info!("registry empty, accepting candidate");
            return decide(0.0, None);
        };
        latest.transformer.check_schema(held_out)?;
        let y_true = held_out.require_column(&self.target)?.to_vec();
        let latest_score = score(&latest.model, &latest.transformer, held_out, &y_true)?;
        let candidate_score = score(candidate_model, candidate_transformer, held_out, &y_true)?;
        info!(latest_version = %latest.version, latest_score, candidate_score, "scored candidate against latest");
        decide(candidate_score, Some(latest_score)).inspect_err(|_| warn!(latest_score, candidate_score, "candidate rejected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use crate::ml::{Matrix, RandomForestRegressor};

    #[test]
    fn decide_is_strict() {
        let r = decide(0.75, Some(0.70)).unwrap();
        assert!(r.accepted);
        assert!((r.improvement.unwrap() - 0.05).abs() < 1e-9);
        assert!(matches!(decide(0.65, Some(0.70)), Err(RulError::ModelRejected { .. })));
        assert!(matches!(decide(0.70, Some(0.70)), Err(RulError::ModelRejected { .. })));
        assert_eq!(decide(0.1, None).unwrap(), EvaluationResult { accepted: true, improvement: None });
    }

    struct Constant(f64);
    impl Regressor for Constant {
        fn predict(&self, x: &Matrix) -> Result<Vec<f64>> { Ok(vec![self.0; x.n_rows()]) }
    }

    fn held_out() -> Frame {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (19 - i) as f64]).collect();
        Frame::from_rows(vec!["s_2".into(), "RUL".into()], &rows).unwrap()
    }

    #[test]
    fn score_maps_back_to_cycles() {
        let f = held_out();
        let t = FeatureTransformer::fit(&f, "RUL", 0.0).unwrap();
        let y = f.column("RUL").unwrap().to_vec();
        // Scaled 0.5 maps back to 9.5 cycles, the mean of the target.
        assert!(score(&Constant(0.5), &t, &f, &y).unwrap().abs() < 1e-12);
    }

    #[test]
    fn empty_registry_accepts_and_schema_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ModelResolver::new(&RegistryConfig { root: dir.path().join("reg"), ..RegistryConfig::default() }).unwrap();
        let f = held_out();
        let t = FeatureTransformer::fit(&f, "RUL", 0.0).unwrap();
        let gate = PromotionGate::new(&resolver, "RUL");
        assert_eq!(gate.evaluate(&Constant(0.5), &t, &f).unwrap().improvement, None);

        let (x, y) = t.transform(&f).unwrap().split_last_column().unwrap();
        let mut m = RandomForestRegressor::new(3).with_random_state(1);
        m.fit(&x, &y).unwrap();
        resolver.promote(&t, &m).unwrap();
        let mut renamed = f.clone();
        let col = renamed.column("s_2").unwrap().to_vec();
        renamed.drop_columns(&["s_2"]);
        renamed.push_column("s_9", col).unwrap();
        assert!(matches!(gate.evaluate(&Constant(0.5), &t, &renamed), Err(RulError::SchemaMismatch(_))));
        assert!(matches!(gate.evaluate(&Constant(0.5), &t, &f), Err(RulError::ModelRejected { .. })));
    }
}
