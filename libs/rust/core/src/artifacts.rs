//! Outputs handed from one training stage to the next. Each is produced once
//! and only read afterwards.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::registry::Version;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub feature_store_file_path: PathBuf,
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub report_file_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub transformer_object_path: PathBuf,
    pub transformed_train_path: PathBuf,
    pub transformed_test_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub model_path: PathBuf,
    pub r2_train_score: f64,
    pub r2_test_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvaluationArtifact {
    pub is_model_accepted: bool,
    pub improved_accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPusherArtifact {
    pub pusher_model_dir: PathBuf,
    pub saved_model_dir: PathBuf,
    pub pushed_version: Version,
}
