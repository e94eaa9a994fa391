use std::collections::HashMap;

use tracing::{debug, info, instrument};

use crate::artifacts::{DataIngestionArtifact, DataTransformationArtifact};
use crate::config::TransformationConfig;
use crate::error::{Result, RulError};
use crate::frame::Frame;
use crate::layout::RunLayout;
use crate::ml::FeatureTransformer;
use crate::registry::save_object;

/// `target = max(cycle of unit) - cycle`, with the maximum taken over the rows of `frame`.
pub fn add_rul_column(frame: &mut Frame, unit_col: &str, cycle_col: &str, target: &str) -> Result<()> {
    let units = frame.require_column(unit_col)?;
    let cycles = frame.require_column(cycle_col)?;
    if units.iter().chain(cycles).any(|v| v.is_nan()) {
        return Err(RulError::invalid(format!("`{unit_col}`/`{cycle_col}` contain missing values")));
    }
    let mut max_cycle: HashMap<u64, f64> = HashMap::new();
    for (u, c) in units.iter().zip(cycles) {
        let m = max_cycle.entry(u.to_bits()).or_insert(*c);
        if *c > *m { *m = *c; }
    }
    let rul: Vec<f64> = units.iter().zip(cycles).map(|(u, c)| max_cycle[&u.to_bits()] - c).collect();
    frame.push_column(target, rul)
}

/// Derive the target when the index columns are present and drop the configured columns.
pub fn prepare_frame(mut frame: Frame, cfg: &TransformationConfig) -> Result<Frame> {
    if frame.has_column(&cfg.unit_column) && frame.has_column(&cfg.cycle_column) && !frame.has_column(&cfg.target_column) {
        add_rul_column(&mut frame, &cfg.unit_column, &cfg.cycle_column, &cfg.target_column)?;
    }
    let dropped = frame.drop_columns(&cfg.drop_columns);
    debug!(?dropped, remaining = frame.width(), "columns dropped");
    Ok(frame)
}

pub struct DataTransformation<'a> {
    cfg: &'a TransformationConfig,
    layout: &'a RunLayout,
}

impl<'a> DataTransformation<'a> {
    pub fn new(cfg: &'a TransformationConfig, layout: &'a RunLayout) -> Self { Self { cfg, layout } }

    /// Fit the transformer on train and persist it with both transformed arrays.
    #[instrument(skip_all)]
    pub fn run(&self, ingestion: &DataIngestionArtifact) -> Result<DataTransformationArtifact> {
        let train = prepare_frame(Frame::read_csv(&ingestion.train_file_path)?, self.cfg)?;
        let test = prepare_frame(Frame::read_csv(&ingestion.test_file_path)?, self.cfg)?;
        let transformer = FeatureTransformer::fit(&train, &self.cfg.target_column, self.cfg.fill_value)?;
        let train_arr = transformer.transform(&train)?;
        let test_arr = transformer.transform(&test)?;

        let art = DataTransformationArtifact {
            transformer_object_path: self.layout.transformer_object(),
            transformed_train_path: self.layout.transformed_train(),
            transformed_test_path: self.layout.transformed_test(),
        };
        save_object(&art.transformer_object_path, &transformer)?;
        save_object(&art.transformed_train_path, &train_arr)?;
        save_object(&art.transformed_test_path, &test_arr)?;
        info!(features = transformer.n_features(), train = ?train_arr.shape(), test = ?test_arr.shape(), "data transformed");
        Ok(art)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        let rows = vec![
            vec![1.0, 1.0, 0.5], vec![1.0, 60.0, 0.6], vec![1.0, 100.0, 0.7],
            vec![2.0, 1.0, 0.1], vec![2.0, 3.0, 0.2],
        ];
        Frame::from_rows(vec!["unit_number".into(), "time_cycles".into(), "s_2".into()], &rows).unwrap()
    }

    #[test]
    fn rul_counts_down_per_unit() {
        let mut f = frame();
        add_rul_column(&mut f, "unit_number", "time_cycles", "RUL").unwrap();
        assert_eq!(f.column("RUL").unwrap(), &[99.0, 40.0, 0.0, 2.0, 0.0]);
    }

    #[test]
    fn prepare_drops_index_after_deriving_target() {
        let cfg = TransformationConfig::default();
        let f = prepare_frame(frame(), &cfg).unwrap();
        assert_eq!(f.columns(), &["s_2".to_string(), "RUL".to_string()]);
        let mut g = frame();
        g.drop_columns(&["unit_number"]);
        assert!(!prepare_frame(g, &cfg).unwrap().has_column("RUL"));
    }

    #[test]
    fn missing_index_values_rejected() {
        let mut f = Frame::from_rows(vec!["unit_number".into(), "time_cycles".into()], &[vec![f64::NAN, 1.0]]).unwrap();
        assert!(add_rul_column(&mut f, "unit_number", "time_cycles", "RUL").is_err());
    }
}
