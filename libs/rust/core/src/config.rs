//! Layered runtime configuration: built-in defaults, an optional YAML file
//! named by `RUL_CONFIG_FILE`, then `RUL__SECTION__KEY` environment overrides.
//!
//! The loaded [`RulConfig`] is passed explicitly to every component; nothing
//! here is cached process-wide.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::ml::forest::{MaxFeatures, SplitCriterion};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulConfig {
    pub registry: RegistryConfig,
    pub artifacts: ArtifactConfig,
    pub store: StoreConfig,
    pub ingestion: IngestionConfig,
    pub validation: ValidationConfig,
    pub transformation: TransformationConfig,
    pub trainer: TrainerConfig,
    pub prediction: PredictionConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub root: PathBuf,
    pub transformer_dir_name: String,
    pub model_dir_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self { Self { root: "saved_models".into(), transformer_dir_name: "transformer".into(), model_dir_name: "model".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Each training run gets a timestamped directory below this root.
    pub root: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self { Self { root: "artifact".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: PathBuf,
    pub database: String,
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self { Self { path: "rul_store".into(), database: "rul".into(), collection: "rul_collect".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self { Self { test_size: 0.2, random_state: 42 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Reference dataset every ingested split is compared against.
    pub base_file_path: PathBuf,
    pub missing_threshold: f64,
    pub drift_significance: f64,
    /// Abort instead of skipping drift when train/test lack base columns.
    pub fail_on_missing_columns: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self { Self { base_file_path: "rul.csv".into(), missing_threshold: 0.2, drift_significance: 0.05, fail_on_missing_columns: false } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationConfig {
    pub target_column: String,
    pub unit_column: String,
    pub cycle_column: String,
    pub drop_columns: Vec<String>,
    pub fill_value: f64,
}

impl Default for TransformationConfig {
    fn default() -> Self {
        let index = ["unit_number", "time_cycles"];
        let settings = ["setting_1", "setting_2", "setting_3"];
        let constant_sensors = ["s_1", "s_5", "s_6", "s_10", "s_16", "s_18", "s_19"];
        Self {
            target_column: "RUL".into(),
            unit_column: "unit_number".into(),
            cycle_column: "time_cycles".into(),
            drop_columns: index.iter().chain(settings.iter()).chain(constant_sensors.iter()).map(|s| s.to_string()).collect(),
            fill_value: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub expected_score: f64,
    pub overfitting_threshold: f64,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub criterion: SplitCriterion,
    pub max_features: MaxFeatures,
    pub random_state: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            expected_score: 0.6,
            overfitting_threshold: 0.5,
            n_estimators: 100,
            max_depth: None,
            min_samples_leaf: 1,
            criterion: SplitCriterion::Poisson,
            max_features: MaxFeatures::Sqrt,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub output_dir: PathBuf,
    /// Dataset predicted when the web surface is hit without an upload.
    pub default_input: PathBuf,
}

impl Default for PredictionConfig {
    fn default() -> Self { Self { output_dir: "prediction".into(), default_input: "rul.csv".into() } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub preview_rows: usize,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { bind: "0.0.0.0:8080".into(), upload_dir: "static/files".into(), max_upload_bytes: 30 * 1000 * 1000, preview_rows: 100 } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub json: bool,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self { Self { dir: "logs".into(), json: false, level: "info".into() } }
}

/// Build the configuration for `service` from defaults, file and environment.
pub fn load_config(service: &str) -> Result<RulConfig> {
    let mut builder = config::Config::builder();
    if let Ok(file) = std::env::var("RUL_CONFIG_FILE") {
        builder = builder.add_source(config::File::with_name(&file).required(false));
    }
    builder = builder.add_source(config::Environment::with_prefix("RUL").separator("__").try_parsing(true));
    let cfg: RulConfig = builder.build()?.try_deserialize()?;
    info!(target: "rul-core", service, registry = %cfg.registry.root.display(), "config loaded");
    Ok(cfg)
}
