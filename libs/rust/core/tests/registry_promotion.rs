mod common;

use std::fs;

use rul_core::config::RegistryConfig;
use rul_core::ml::{FeatureTransformer, RandomForestRegressor};
use rul_core::registry::{ArtifactKind, ModelResolver, PromotionGate, Version};
use rul_core::RulError;

fn fitted(frame: &rul_core::Frame, trees: usize, depth: Option<usize>) -> (FeatureTransformer, RandomForestRegressor) {
    let mut f = frame.clone();
    rul_core::components::add_rul_column(&mut f, "unit_number", "time_cycles", "RUL").unwrap();
    f.drop_columns(&["unit_number", "time_cycles", "s_1"]);
    let t = FeatureTransformer::fit(&f, "RUL", 0.0).unwrap();
    let (x, y) = t.transform(&f).unwrap().split_last_column().unwrap();
    let mut m = RandomForestRegressor::new(trees).with_max_depth(depth).with_random_state(3);
    m.fit(&x, &y).unwrap();
    (t, m)
}

#[test]
fn promotions_allocate_increasing_versions() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ModelResolver::new(&RegistryConfig { root: dir.path().join("saved_models"), ..RegistryConfig::default() }).unwrap();
    let (t, m) = fitted(&common::engine_frame(), 5, None);

    assert_eq!(resolver.promote(&t, &m).unwrap(), Version(0));
    assert_eq!(resolver.promote(&t, &m).unwrap(), Version(1));
    assert!(dir.path().join("saved_models/1/transformer/transformer.pkl").is_file());
    assert!(dir.path().join("saved_models/1/model/model.pkl").is_file());
    let latest = resolver.load_latest().unwrap().unwrap();
    assert_eq!(latest.version, Version(1));
    assert_eq!(latest.transformer.feature_names(), t.feature_names());

    fs::create_dir(dir.path().join("saved_models/5")).unwrap();
    assert_eq!(resolver.next_version().unwrap(), Version(6));
    assert!(resolver.path_for(Version(6), ArtifactKind::Model).ends_with("6/model/model.pkl"));
}

#[test]
fn gate_compares_against_latest_version() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = ModelResolver::new(&RegistryConfig { root: dir.path().join("saved_models"), ..RegistryConfig::default() }).unwrap();
    let data = common::engine_frame();
    let (weak_t, weak_m) = fitted(&data, 5, Some(1));
    let (strong_t, strong_m) = fitted(&data, 20, None);

    let mut held_out = data.clone();
    rul_core::components::add_rul_column(&mut held_out, "unit_number", "time_cycles", "RUL").unwrap();
    let gate = PromotionGate::new(&resolver, "RUL");

    let first = gate.evaluate(&weak_m, &weak_t, &held_out).unwrap();
    assert!(first.accepted && first.improvement.is_none());
    resolver.promote(&weak_t, &weak_m).unwrap();

    // A model never beats itself.
    assert!(matches!(gate.evaluate(&weak_m, &weak_t, &held_out), Err(RulError::ModelRejected { .. })));
    let better = gate.evaluate(&strong_m, &strong_t, &held_out).unwrap();
    assert!(better.accepted);
    assert!(better.improvement.unwrap() > 0.0);
}
