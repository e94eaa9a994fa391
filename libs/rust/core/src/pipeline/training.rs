//! Linear training pipeline: ingest, validate, transform, train, evaluate, push.
//! Any stage error aborts the run; nothing is retried or resumed.
use tracing::{error, info, info_span};

use crate::artifacts::ModelPusherArtifact;
use crate::components::{DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelPusher, ModelTrainer};
use crate::config::RulConfig;
use crate::error::{Result, RulError};
use crate::layout::RunLayout;
use crate::lifecycle::{TrainingRun, TrainingStage};
use crate::registry::ModelResolver;
use crate::store::{Collection, DocumentStore};
use crate::telemetry::{outcome, METRICS};

/// Zero-argument entry point apart from configuration: pulls the configured
/// collection and runs every stage under a fresh timestamped artifact directory.
pub fn start_training_pipeline(cfg: &RulConfig) -> Result<ModelPusherArtifact> {
    let store = DocumentStore::open(&cfg.store.path)?;
    let source = store.collection(&cfg.store.database, &cfg.store.collection)?;
    run_training(cfg, &RunLayout::create(cfg)?, &source)
}

pub fn run_training(cfg: &RulConfig, layout: &RunLayout, source: &Collection) -> Result<ModelPusherArtifact> {
    let span = info_span!("training_pipeline", artifact_dir = %layout.artifact_dir().display());
    let _enter = span.enter();
    let result = run_stages(cfg, layout, source);
    METRICS.runs_total.with_label_values(&[outcome(&result)]).inc();
    match &result {
        Ok(art) => {
            METRICS.promotions_total.inc();
            info!(version = %art.pushed_version, "training pipeline finished");
        }
        Err(e @ RulError::ModelRejected { .. }) => {
            METRICS.rejections_total.inc();
            info!(error = %e, "training pipeline finished without promotion");
        }
        Err(e) => error!(error = %e, kind = e.kind(), "training pipeline failed"),
    }
    result
}

fn run_stages(cfg: &RulConfig, layout: &RunLayout, source: &Collection) -> Result<ModelPusherArtifact> {
    let resolver = ModelResolver::new(&cfg.registry)?;
    let mut run = TrainingRun::new();

    let ingestion = DataIngestion::new(&cfg.ingestion, layout).run(source)?;
    mark(&mut run, TrainingStage::Ingested)?;
    let _validation = DataValidation::new(&cfg.validation, layout).run(&ingestion)?;
    mark(&mut run, TrainingStage::Validated)?;
    let transformation = DataTransformation::new(&cfg.transformation, layout).run(&ingestion)?;
    mark(&mut run, TrainingStage::Transformed)?;
    let trainer = ModelTrainer::new(&cfg.trainer, layout).run(&transformation)?;
    mark(&mut run, TrainingStage::Trained)?;
    let evaluation = ModelEvaluation::new(&cfg.transformation, &resolver).run(&ingestion, &transformation, &trainer)?;
    info!(accepted = evaluation.is_model_accepted, improved_accuracy = ?evaluation.improved_accuracy, "candidate accepted");
    mark(&mut run, TrainingStage::Evaluated)?;
    let pushed = ModelPusher::new(layout, &resolver).run(&transformation, &trainer)?;
    mark(&mut run, TrainingStage::Pushed)?;
    info!(total_ms = run.elapsed().as_millis() as u64, "all stages complete");
    Ok(pushed)
}

fn mark(run: &mut TrainingRun, stage: TrainingStage) -> Result<()> {
    let d = run.advance(stage)?;
    METRICS.stage_latency_ms.with_label_values(&[stage.as_str()]).observe(d.as_secs_f64() * 1e3);
    info!(stage = stage.as_str(), elapsed_ms = d.as_millis() as u64, "stage complete");
    Ok(())
}
