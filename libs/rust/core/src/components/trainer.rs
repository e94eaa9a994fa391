use tracing::{info, instrument};

use crate::artifacts::{DataTransformationArtifact, ModelTrainerArtifact};
use crate::config::TrainerConfig;
use crate::error::{Result, RulError};
use crate::layout::RunLayout;
use crate::ml::metrics::r2_score;
use crate::ml::{Matrix, RandomForestRegressor, Regressor};
use crate::registry::{load_object, save_object};

/// Reject a fit whose test score is below `expected` or whose train/test gap
/// is strictly above `threshold`.
pub fn check_fit(train_score: f64, test_score: f64, expected: f64, threshold: f64) -> Result<()> {
    if test_score < expected {
        return Err(RulError::Underfitting { score: test_score, expected });
    }
    let gap = (train_score - test_score).abs();
    if gap > threshold {
        return Err(RulError::Overfitting { gap, threshold });
    }
    Ok(())
}

pub fn build_forest(cfg: &TrainerConfig) -> RandomForestRegressor {
    RandomForestRegressor::new(cfg.n_estimators)
        .with_criterion(cfg.criterion)
        .with_max_features(cfg.max_features)
        .with_max_depth(cfg.max_depth)
        .with_min_samples_leaf(cfg.min_samples_leaf)
        .with_random_state(cfg.random_state)
}

pub struct ModelTrainer<'a> {
    cfg: &'a TrainerConfig,
    layout: &'a RunLayout,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(cfg: &'a TrainerConfig, layout: &'a RunLayout) -> Self { Self { cfg, layout } }

    #[instrument(skip_all, fields(n_estimators = self.cfg.n_estimators))]
    pub fn run(&self, transformation: &DataTransformationArtifact) -> Result<ModelTrainerArtifact> {
        let train: Matrix = load_object(&transformation.transformed_train_path)?;
        let test: Matrix = load_object(&transformation.transformed_test_path)?;
        let (x_train, y_train) = train.split_last_column()?;
        let (x_test, y_test) = test.split_last_column()?;

        let mut model = build_forest(self.cfg);
        model.fit(&x_train, &y_train)?;
        let r2_train_score = r2_score(&y_train, &model.predict(&x_train)?)?;
        let r2_test_score = r2_score(&y_test, &model.predict(&x_test)?)?;
        info!(r2_train_score, r2_test_score, "model fitted");
        check_fit(r2_train_score, r2_test_score, self.cfg.expected_score, self.cfg.overfitting_threshold)?;

        let model_path = self.layout.trained_model();
        save_object(&model_path, &model)?;
        Ok(ModelTrainerArtifact { model_path, r2_train_score, r2_test_score })
    }
}
