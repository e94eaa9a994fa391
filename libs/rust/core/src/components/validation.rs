//! Data validation: missing-value pruning, required-column check and
//! per-column drift against the reference dataset, reported as YAML.
use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::artifacts::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::ValidationConfig;
use crate::error::{Result, RulError};
use crate::frame::Frame;
use crate::layout::RunLayout;
use crate::ml::stats::ks_2samp;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftRecord {
    pub pvalues: f64,
    pub same_distribution: bool,
}

pub type DriftReport = BTreeMap<String, DriftRecord>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub missing_values_within_base_dataset: Vec<String>,
    pub missing_values_within_train_dataset: Vec<String>,
    pub missing_values_within_test_dataset: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_columns_within_train_dataset: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_columns_within_test_dataset: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_drift_within_train_dataset: Option<DriftReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_drift_within_test_dataset: Option<DriftReport>,
}

/// Drop every column whose missing fraction is strictly above `threshold`.
/// Returns the dropped names; a frame left without columns is a schema mismatch.
pub fn drop_missing_value_columns(frame: &mut Frame, threshold: f64, label: &str) -> Result<Vec<String>> {
    let over: Vec<String> = frame.missing_fraction().into_iter().filter(|(_, f)| *f > threshold).map(|(n, _)| n).collect();
    let dropped = frame.drop_columns(&over);
    if frame.is_empty() {
        return Err(RulError::SchemaMismatch(format!("{label} dataset has no columns left after dropping {dropped:?}")));
    }
    Ok(dropped)
}

/// Base columns absent from `current`, in base order.
pub fn missing_columns(base: &Frame, current: &Frame) -> Vec<String> {
    base.columns().iter().filter(|c| !current.has_column(c)).cloned().collect()
}

/// Two-sample KS per base column; `same_distribution` holds when the p-value exceeds `significance`.
pub fn data_drift(base: &Frame, current: &Frame, significance: f64) -> Result<DriftReport> {
    let mut report = DriftReport::new();
    for name in base.columns() {
        let r = ks_2samp(base.require_column(name)?, current.require_column(name)?)?;
        report.insert(name.clone(), DriftRecord { pvalues: r.pvalue, same_distribution: r.pvalue > significance });
    }
    Ok(report)
}

pub struct DataValidation<'a> {
    cfg: &'a ValidationConfig,
    layout: &'a RunLayout,
}

impl<'a> DataValidation<'a> {
    pub fn new(cfg: &'a ValidationConfig, layout: &'a RunLayout) -> Self { Self { cfg, layout } }

    #[instrument(skip_all, fields(base = %self.cfg.base_file_path.display()))]
    pub fn run(&self, ingestion: &DataIngestionArtifact) -> Result<DataValidationArtifact> {
        let mut base = Frame::read_csv(&self.cfg.base_file_path)?;
        let mut train = Frame::read_csv(&ingestion.train_file_path)?;
        let mut test = Frame::read_csv(&ingestion.test_file_path)?;
        let t = self.cfg.missing_threshold;
        let mut report = ValidationReport {
            missing_values_within_base_dataset: drop_missing_value_columns(&mut base, t, "base")?,
            missing_values_within_train_dataset: drop_missing_value_columns(&mut train, t, "train")?,
            missing_values_within_test_dataset: drop_missing_value_columns(&mut test, t, "test")?,
            ..ValidationReport::default()
        };

        let mut absent = Vec::new();
        for (label, frame) in [("train", &train), ("test", &test)] {
            let missing = missing_columns(&base, frame);
            let drift = if missing.is_empty() {
                Some(data_drift(&base, frame, self.cfg.drift_significance)?)
            } else {
                warn!(dataset = label, ?missing, "required columns missing, drift skipped");
                absent.push((label, missing.clone()));
                None
            };
            let missing = (!missing.is_empty()).then_some(missing);
            match label {
                "train" => { report.missing_columns_within_train_dataset = missing; report.data_drift_within_train_dataset = drift; }
                _ => { report.missing_columns_within_test_dataset = missing; report.data_drift_within_test_dataset = drift; }
            }
        }

        let report_file_path = self.layout.validation_report();
        write_report(&report_file_path, &report)?;
        let drifted = [&report.data_drift_within_train_dataset, &report.data_drift_within_test_dataset]
            .into_iter().flatten().flat_map(|d| d.values()).filter(|r| !r.same_distribution).count();
        info!(report = %report_file_path.display(), drifted, "validation report written");
        if self.cfg.fail_on_missing_columns {
            if let Some((label, missing)) = absent.into_iter().next() {
                return Err(RulError::SchemaMismatch(format!("{label} dataset lacks required columns {missing:?}")));
            }
        }
        Ok(DataValidationArtifact { report_file_path })
    }
}

fn write_report(path: &std::path::Path, report: &ValidationReport) -> Result<()> {
    if let Some(dir) = path.parent() { fs::create_dir_all(dir).map_err(|e| RulError::io(dir, e))?; }
    fs::write(path, serde_yaml::to_string(report)?).map_err(|e| RulError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulConfig;

    fn cols(names: &[&str]) -> Vec<String> { names.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn drops_columns_above_threshold_only() {
        let nan = f64::NAN;
        let mut f = Frame::from_rows(cols(&["a", "b", "c"]), &[
            vec![1.0, nan, nan], vec![2.0, 1.0, nan], vec![3.0, 1.0, 1.0], vec![4.0, 1.0, 1.0], vec![5.0, 1.0, 1.0],
        ]).unwrap();
        // b is exactly at 0.2 and stays; c is at 0.4 and goes.
        assert_eq!(drop_missing_value_columns(&mut f, 0.2, "t").unwrap(), cols(&["c"]));
        assert_eq!(f.columns(), cols(&["a", "b"]).as_slice());
        let mut all_nan = Frame::from_rows(cols(&["x"]), &[vec![nan]]).unwrap();
        assert!(matches!(drop_missing_value_columns(&mut all_nan, 0.2, "t"), Err(RulError::SchemaMismatch(_))));
    }

    fn write(path: &std::path::Path, names: &[&str], n: usize, shift: f64) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| names.iter().map(|_| i as f64 + shift).collect()).collect();
        Frame::from_rows(cols(names), &rows).unwrap().write_csv(path).unwrap();
    }

    #[test]
    fn report_records_drift_and_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = RulConfig::default();
        cfg.validation.base_file_path = dir.path().join("rul.csv");
        write(&cfg.validation.base_file_path, &["s_2", "s_3"], 100, 0.0);
        let layout = RunLayout::at(&cfg, dir.path().join("run"));
        let ing = DataIngestionArtifact {
            feature_store_file_path: cfg.validation.base_file_path.clone(),
            train_file_path: dir.path().join("train.csv"),
            test_file_path: dir.path().join("test.csv"),
        };
        write(&ing.train_file_path, &["s_2", "s_3"], 100, 500.0);
        write(&ing.test_file_path, &["s_2"], 100, 0.0);

        let art = DataValidation::new(&cfg.validation, &layout).run(&ing).unwrap();
        let report: ValidationReport = serde_yaml::from_str(&fs::read_to_string(&art.report_file_path).unwrap()).unwrap();
        let drift = report.data_drift_within_train_dataset.unwrap();
        assert!(!drift["s_2"].same_distribution);
        assert_eq!(report.missing_columns_within_test_dataset, Some(cols(&["s_3"])));
        assert!(report.data_drift_within_test_dataset.is_none());
        assert!(report.missing_columns_within_train_dataset.is_none());

        cfg.validation.fail_on_missing_columns = true;
        assert!(matches!(DataValidation::new(&cfg.validation, &layout).run(&ing), Err(RulError::SchemaMismatch(_))));
    }
}
