use tracing::{info, instrument};

use crate::artifacts::{DataIngestionArtifact, DataTransformationArtifact, ModelEvaluationArtifact, ModelTrainerArtifact};
use crate::config::TransformationConfig;
use crate::error::Result;
use crate::frame::Frame;
use crate::ml::{FeatureTransformer, RandomForestRegressor};
use crate::registry::{load_object, ModelResolver, PromotionGate};

use super::transformation::prepare_frame;

pub struct ModelEvaluation<'a> {
    cfg: &'a TransformationConfig,
    resolver: &'a ModelResolver,
}

impl<'a> ModelEvaluation<'a> {
    pub fn new(cfg: &'a TransformationConfig, resolver: &'a ModelResolver) -> Self { Self { cfg, resolver } }

    /// Score the run's candidate against the latest registered model on the
    /// ingested test split. Rejection surfaces as `ModelRejected`.
    #[instrument(skip_all)]
    pub fn run(&self, ingestion: &DataIngestionArtifact, transformation: &DataTransformationArtifact, trainer: &ModelTrainerArtifact) -> Result<ModelEvaluationArtifact> {
        let transformer: FeatureTransformer = load_object(&transformation.transformer_object_path)?;
        let model: RandomForestRegressor = load_object(&trainer.model_path)?;
        let held_out = prepare_frame(Frame::read_csv(&ingestion.test_file_path)?, self.cfg)?;
        let result = PromotionGate::new(self.resolver, &self.cfg.target_column).evaluate(&model, &transformer, &held_out)?;
        info!(accepted = result.accepted, improvement = ?result.improvement, "model evaluated");
        Ok(ModelEvaluationArtifact { is_model_accepted: result.accepted, improved_accuracy: result.improvement })
    }
}
