mod common;

use rul_core::layout::RunLayout;
use rul_core::pipeline::run_training;
use rul_core::store::DocumentStore;
use rul_core::{start_batch_prediction, start_training_pipeline, Frame, ModelResolver, RulError, Version};

#[test]
fn train_promote_reject_then_predict() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = common::config(dir.path());
    let data = common::engine_frame();
    data.write_csv(&cfg.validation.base_file_path).unwrap();
    let store = DocumentStore::open(&cfg.store.path).unwrap();
    let source = store.collection(&cfg.store.database, &cfg.store.collection).unwrap();
    source.insert_frame(&data).unwrap();

    let first = run_training(&cfg, &RunLayout::at(&cfg, dir.path().join("artifact/run1")), &source).unwrap();
    assert_eq!(first.pushed_version, Version(0));
    assert!(first.pusher_model_dir.join("model/model.pkl").exists());
    assert!(dir.path().join("artifact/run1/data_validation/report.yaml").exists());

    // Identical data and seeds give an identical score, which is not an improvement.
    let second = run_training(&cfg, &RunLayout::at(&cfg, dir.path().join("artifact/run2")), &source);
    assert!(matches!(second, Err(RulError::ModelRejected { .. })), "{second:?}");
    let resolver = ModelResolver::new(&cfg.registry).unwrap();
    assert_eq!(resolver.versions().unwrap(), vec![Version(0)]);

    let out = start_batch_prediction(&cfg, &cfg.validation.base_file_path).unwrap();
    assert!(out.starts_with(&cfg.prediction.output_dir));
    assert!(out.file_name().unwrap().to_string_lossy().starts_with("rul"));
    let predicted = Frame::read_csv(&out).unwrap();
    assert_eq!(predicted.height(), data.height());
    assert_eq!(predicted.columns(), &["s_2", "s_3", "s_4", "RUL"].map(String::from));
    assert!(predicted.column("RUL").unwrap().iter().all(|v| v.is_finite() && *v >= 0.0));

    let text = rul_core::telemetry::render().unwrap();
    assert!(text.contains("rul_model_promotions_total"));
}

#[test]
fn training_from_configured_store_and_missing_registry_prediction() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = common::config(dir.path());
    let data = common::engine_frame();
    data.write_csv(&cfg.validation.base_file_path).unwrap();

    assert!(matches!(start_batch_prediction(&cfg, &cfg.validation.base_file_path), Err(RulError::ArtifactNotFound(_))));

    {
        let store = DocumentStore::open(&cfg.store.path).unwrap();
        store.collection(&cfg.store.database, &cfg.store.collection).unwrap().insert_frame(&data).unwrap();
    }
    let art = start_training_pipeline(&cfg).unwrap();
    assert_eq!(art.pushed_version, Version(0));
    assert_eq!(art.saved_model_dir, cfg.registry.root);
}

#[test]
fn prediction_input_missing_features_is_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = common::config(dir.path());
    let data = common::engine_frame();
    data.write_csv(&cfg.validation.base_file_path).unwrap();
    let store = DocumentStore::open(&cfg.store.path).unwrap();
    let source = store.collection(&cfg.store.database, &cfg.store.collection).unwrap();
    source.insert_frame(&data).unwrap();
    run_training(&cfg, &RunLayout::at(&cfg, dir.path().join("artifact/run")), &source).unwrap();

    let mut partial = data.clone();
    partial.drop_columns(&["s_3"]);
    let input = dir.path().join("partial.csv");
    partial.write_csv(&input).unwrap();
    assert!(matches!(start_batch_prediction(&cfg, &input), Err(RulError::SchemaMismatch(_))));
}
