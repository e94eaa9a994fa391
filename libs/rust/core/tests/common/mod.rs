#![allow(dead_code)]

use std::path::Path;

use rul_core::config::RulConfig;
use rul_core::Frame;

/// Ten engines whose sensors degrade linearly as they approach failure.
pub fn engine_frame() -> Frame {
    let columns = ["unit_number", "time_cycles", "s_1", "s_2", "s_3", "s_4"].iter().map(|s| s.to_string()).collect();
    let mut rows = Vec::new();
    for unit in 1..=10u32 {
        let max_cycle = 50 + 5 * unit;
        for cycle in 1..=max_cycle {
            let rul = (max_cycle - cycle) as f64;
            let wobble = ((cycle * 37 + unit * 11) % 11) as f64 * 0.01;
            rows.push(vec![unit as f64, cycle as f64, 518.67, 642.0 - 0.05 * rul + wobble, 1590.0 - 0.3 * rul, 1400.0 - 0.2 * rul - wobble]);
        }
    }
    Frame::from_rows(columns, &rows).unwrap()
}

pub fn config(root: &Path) -> RulConfig {
    let mut cfg = RulConfig::default();
    cfg.registry.root = root.join("saved_models");
    cfg.artifacts.root = root.join("artifact");
    cfg.store.path = root.join("store");
    cfg.validation.base_file_path = root.join("rul.csv");
    cfg.prediction.output_dir = root.join("prediction");
    cfg.trainer.n_estimators = 20;
    cfg
}
