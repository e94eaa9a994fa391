use std::path::PathBuf;

use anyhow::{Context, Result};
use rul_core::{init_tracing, load_config, start_batch_prediction};
use tracing::info;

/// Usage: `batch-prediction [INPUT_CSV]`; defaults to `prediction.default_input`.
fn main() -> Result<()> {
    let cfg = load_config("batch-prediction")?;
    init_tracing("batch-prediction", &cfg.log)?;
    let input = std::env::args_os().nth(1).map(PathBuf::from).unwrap_or_else(|| cfg.prediction.default_input.clone());
    let output = start_batch_prediction(&cfg, &input).with_context(|| format!("predicting {}", input.display()))?;
    info!(output = %output.display(), "prediction file written");
    println!("{}", output.display());
    Ok(())
}
