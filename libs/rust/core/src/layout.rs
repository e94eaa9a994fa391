//! Per-run directory layout under `artifacts.root/<%m%d%Y_%H%M%S>/`.
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::config::RulConfig;
use crate::error::{Result, RulError};

pub const RUN_DIR_FORMAT: &str = "%m%d%Y_%H%M%S";
const MAX_SAME_SECOND_RUNS: usize = 1000;

#[derive(Debug, Clone)]
pub struct RunLayout {
    artifact_dir: PathBuf,
    feature_file_name: String,
    transformer_file: PathBuf,
    model_file: PathBuf,
}

impl RunLayout {
    /// Claim a fresh run directory named after the current second. A run that
    /// starts within the same second as an earlier one gets a `_<n>` suffix.
    pub fn create(cfg: &RulConfig) -> Result<Self> {
        let root = &cfg.artifacts.root;
        fs::create_dir_all(root).map_err(|e| RulError::io(root, e))?;
        let stamp = Local::now().format(RUN_DIR_FORMAT).to_string();
        for n in 0..MAX_SAME_SECOND_RUNS {
            let dir = if n == 0 { root.join(&stamp) } else { root.join(format!("{stamp}_{n}")) };
            match fs::create_dir(&dir) {
                Ok(()) => return Ok(Self::at(cfg, dir)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(RulError::io(&dir, e)),
            }
        }
        Err(RulError::invalid(format!("more than {MAX_SAME_SECOND_RUNS} runs started at {stamp}")))
    }

    /// Layout rooted at an explicit directory.
    pub fn at(cfg: &RulConfig, artifact_dir: PathBuf) -> Self {
        let feature_file_name = cfg.validation.base_file_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "rul.csv".into());
        let reg = &cfg.registry;
        Self {
            artifact_dir,
            feature_file_name,
            transformer_file: Path::new(&reg.transformer_dir_name).join("transformer.pkl"),
            model_file: Path::new(&reg.model_dir_name).join("model.pkl"),
        }
    }

    pub fn artifact_dir(&self) -> &Path { &self.artifact_dir }

    fn ingestion_dir(&self) -> PathBuf { self.artifact_dir.join("data_ingestion") }
    pub fn feature_store_file(&self) -> PathBuf { self.ingestion_dir().join("feature_store").join(&self.feature_file_name) }
    pub fn train_file(&self) -> PathBuf { self.ingestion_dir().join("dataset").join("train.csv") }
    pub fn test_file(&self) -> PathBuf { self.ingestion_dir().join("dataset").join("test.csv") }

    pub fn validation_report(&self) -> PathBuf { self.artifact_dir.join("data_validation").join("report.yaml") }

    fn transformation_dir(&self) -> PathBuf { self.artifact_dir.join("data_transformation") }
    pub fn transformer_object(&self) -> PathBuf { self.transformation_dir().join(&self.transformer_file) }
    pub fn transformed_train(&self) -> PathBuf { self.transformation_dir().join("transformed").join("train.bin") }
    pub fn transformed_test(&self) -> PathBuf { self.transformation_dir().join("transformed").join("test.bin") }

    pub fn trained_model(&self) -> PathBuf { self.artifact_dir.join("model_trainer").join(&self.model_file) }

    pub fn pusher_dir(&self) -> PathBuf { self.artifact_dir.join("model_pusher").join("saved_models") }
    pub fn pusher_transformer(&self) -> PathBuf { self.pusher_dir().join(&self.transformer_file) }
    pub fn pusher_model(&self) -> PathBuf { self.pusher_dir().join(&self.model_file) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_paths_nest_under_run_dir() {
        let cfg = RulConfig::default();
        let l = RunLayout::at(&cfg, PathBuf::from("/tmp/run"));
        assert_eq!(l.feature_store_file(), PathBuf::from("/tmp/run/data_ingestion/feature_store/rul.csv"));
        assert_eq!(l.transformer_object(), PathBuf::from("/tmp/run/data_transformation/transformer/transformer.pkl"));
        assert_eq!(l.pusher_model(), PathBuf::from("/tmp/run/model_pusher/saved_models/model/model.pkl"));
    }

    #[test]
    fn runs_in_the_same_second_get_distinct_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = RulConfig::default();
        cfg.artifacts.root = dir.path().join("artifact");
        let a = RunLayout::create(&cfg).unwrap();
        let b = RunLayout::create(&cfg).unwrap();
        assert_ne!(a.artifact_dir(), b.artifact_dir());
        assert!(a.artifact_dir().is_dir() && b.artifact_dir().is_dir());
        assert!(a.artifact_dir().starts_with(&cfg.artifacts.root));
    }
}
