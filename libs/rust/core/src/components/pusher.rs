use tracing::{info, instrument};

use crate::artifacts::{DataTransformationArtifact, ModelPusherArtifact, ModelTrainerArtifact};
use crate::error::Result;
use crate::layout::RunLayout;
use crate::ml::{FeatureTransformer, RandomForestRegressor};
use crate::registry::{load_object, save_object, ModelResolver};

pub struct ModelPusher<'a> {
    layout: &'a RunLayout,
    resolver: &'a ModelResolver,
}

impl<'a> ModelPusher<'a> {
    pub fn new(layout: &'a RunLayout, resolver: &'a ModelResolver) -> Self { Self { layout, resolver } }

    /// Copy the accepted pair into the run's pusher directory, then into a new registry version.
    #[instrument(skip_all)]
    pub fn run(&self, transformation: &DataTransformationArtifact, trainer: &ModelTrainerArtifact) -> Result<ModelPusherArtifact> {
        let transformer: FeatureTransformer = load_object(&transformation.transformer_object_path)?;
        let model: RandomForestRegressor = load_object(&trainer.model_path)?;
        save_object(self.layout.pusher_transformer(), &transformer)?;
        save_object(self.layout.pusher_model(), &model)?;
        let pushed_version = self.resolver.promote(&transformer, &model)?;
        info!(version = %pushed_version, "model pushed");
        Ok(ModelPusherArtifact { pusher_model_dir: self.layout.pusher_dir(), saved_model_dir: self.resolver.root().to_path_buf(), pushed_version })
    }
}
