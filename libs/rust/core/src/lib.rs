//! Core library for the RUL prediction services: model registry, training
//! stages, batch prediction and the shared ambient stack (config, tracing,
//! metrics).

use std::fs::{self, File};
use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use chrono::Local;
use once_cell::sync::OnceCell;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod artifacts;
pub mod components;
pub mod config;
pub mod error;
pub mod frame;
pub mod layout;
pub mod lifecycle;
pub mod ml;
pub mod pipeline;
pub mod registry;
pub mod store;
pub mod telemetry;

pub use config::{load_config, RulConfig};
pub use error::{Result, RulError};
pub use frame::Frame;
pub use pipeline::{start_batch_prediction, start_training_pipeline};
pub use registry::{ModelResolver, PromotionGate, Version};

static TRACING_INIT: OnceCell<()> = OnceCell::new();

pub const LOG_FILE_FORMAT: &str = "%m%d%Y_%H%M%S";

/// Install the global subscriber once: env filter, stdout (JSON when
/// `RUL_JSON_LOG` is set or `log.json` is true) and a plain-text file under `log.dir`.
pub fn init_tracing(service: &str, cfg: &config::LogConfig) -> AnyResult<()> {
    TRACING_INIT.get_or_try_init(|| -> AnyResult<()> {
        let json = cfg.json || std::env::var("RUL_JSON_LOG").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        fs::create_dir_all(&cfg.dir).with_context(|| format!("creating log dir {}", cfg.dir.display()))?;
        let log_path = cfg.dir.join(format!("{}.log", Local::now().format(LOG_FILE_FORMAT)));
        let file = File::create(&log_path).with_context(|| format!("creating log file {}", log_path.display()))?;

        let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cfg.level))?;
        let json_layer = json.then(|| fmt::layer().json().flatten_event(true).with_current_span(true).with_span_list(false));
        let text_layer = (!json).then(|| fmt::layer().with_target(true).with_line_number(true));
        let file_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(file));
        tracing_subscriber::registry().with(env_filter).with(json_layer).with(text_layer).with(file_layer).try_init()?;
        Ok(())
    })?;
    info!(target: "rul-core", service, "tracing initialized");
    Ok(())
}
