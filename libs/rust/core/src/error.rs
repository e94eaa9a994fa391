//! Error taxonomy shared by every pipeline stage.
//!
//! All variants are fatal to the current run; nothing in the core retries.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulError {
    #[error("artifact not found: {0}")]
    ArtifactNotFound(PathBuf),
    #[error("invalid registry state: directory `{name}` under {root} {reason}")]
    InvalidRegistryState { root: PathBuf, name: String, reason: &'static str },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("model rejected: candidate r2 {candidate:.4} does not beat latest r2 {latest:.4}")]
    ModelRejected { candidate: f64, latest: f64 },
    #[error("underfitting: test r2 {score:.4} is below expected {expected:.4}")]
    Underfitting { score: f64, expected: f64 },
    #[error("overfitting: train/test r2 gap {gap:.4} exceeds threshold {threshold:.4}")]
    Overfitting { gap: f64, threshold: f64 },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, #[source] source: std::io::Error },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Encode(#[from] bincode::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] sled::Error),
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("ml backend: {0}")]
    Backend(#[from] aprender::AprenderError),
}

pub type Result<T> = std::result::Result<T, RulError>;

impl RulError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self { Self::Io { path: path.into(), source } }

    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidData(msg.into()) }

    /// Short machine-readable label, used as a metrics dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArtifactNotFound(_) => "artifact_not_found",
            Self::InvalidRegistryState { .. } => "invalid_registry_state",
            Self::SchemaMismatch(_) => "schema_mismatch",
            Self::ModelRejected { .. } => "model_rejected",
            Self::Underfitting { .. } => "underfitting",
            Self::Overfitting { .. } => "overfitting",
            Self::InvalidData(_) => "invalid_data",
            Self::Io { .. } => "io",
            Self::Csv(_) => "csv",
            Self::Encode(_) => "encode",
            Self::Yaml(_) => "yaml",
            Self::Json(_) => "json",
            Self::Store(_) => "store",
            Self::Config(_) => "config",
            Self::Backend(_) => "ml_backend",
        }
    }
}
