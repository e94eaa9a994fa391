use anyhow::Result;
use rul_core::{init_tracing, load_config, start_training_pipeline, RulError};
use tracing::{error, info};

fn main() -> Result<()> {
    let cfg = load_config("training-pipeline")?;
    init_tracing("training-pipeline", &cfg.log)?;
    match start_training_pipeline(&cfg) {
        Ok(art) => {
            info!(version = %art.pushed_version, registry = %art.saved_model_dir.display(), "training complete");
            Ok(())
        }
        Err(e @ RulError::ModelRejected { .. }) => {
            info!(reason = %e, "current model kept");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "training failed");
            Err(e.into())
        }
    }
}
