use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, instrument, warn};

use crate::components::prepare_frame;
use crate::config::RulConfig;
use crate::error::{Result, RulError};
use crate::frame::Frame;
use crate::registry::ModelResolver;
use crate::ml::Regressor;
use crate::telemetry::{outcome, METRICS};

pub const OUTPUT_STAMP_FORMAT: &str = "%m%d%Y__%H%M%S";

/// Score `input` with the latest registered model and write the features
/// plus predicted target, in original units, to the prediction directory.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn start_batch_prediction(cfg: &RulConfig, input: impl AsRef<Path>) -> Result<PathBuf> {
    let result = predict_file(cfg, input.as_ref());
    METRICS.predictions_total.with_label_values(&[outcome(&result)]).inc();
    if let Err(e) = &result { warn!(error = %e, "batch prediction failed"); }
    result
}

fn predict_file(cfg: &RulConfig, input: &Path) -> Result<PathBuf> {
    let resolver = ModelResolver::new(&cfg.registry)?;
    let frame = Frame::read_csv(input)?;
    let entry = resolver.load_latest()?.ok_or_else(|| RulError::ArtifactNotFound(resolver.root().to_path_buf()))?;
    let frame = prepare_frame(frame, &cfg.transformation)?;
    if frame.height() == 0 { return Err(RulError::invalid(format!("{} has no rows to predict", input.display()))); }

    let x = entry.transformer.transform_features(&frame)?;
    let predicted = entry.model.predict(&x)?;
    let restored = entry.transformer.inverse_transform(&x.with_column(&predicted)?)?;
    let output = Frame::from_matrix(entry.transformer.output_columns(), &restored)?;

    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "prediction".into());
    let path = cfg.prediction.output_dir.join(format!("{stem}{}.csv", Local::now().format(OUTPUT_STAMP_FORMAT)));
    output.write_csv(&path)?;
    METRICS.predicted_rows_total.inc_by(output.height() as u64);
    info!(version = %entry.version, rows = output.height(), output = %path.display(), "batch prediction written");
    Ok(path)
}
