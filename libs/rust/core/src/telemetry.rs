//! Prometheus metrics for training runs and predictions, registered once in
//! the default registry.

use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec, IntCounter, IntCounterVec, TextEncoder};

pub struct PipelineMetrics {
    pub runs_total: IntCounterVec,
    pub stage_latency_ms: HistogramVec,
    pub promotions_total: IntCounter,
    pub rejections_total: IntCounter,
    pub predictions_total: IntCounterVec,
    pub predicted_rows_total: IntCounter,
}

const LATENCY_BUCKETS_MS: &[f64] = &[5.0, 25.0, 100.0, 500.0, 2_000.0, 10_000.0, 60_000.0, 300_000.0];

pub static METRICS: Lazy<PipelineMetrics> = Lazy::new(|| PipelineMetrics {
    runs_total: register_int_counter_vec!("rul_training_runs_total", "Training pipeline runs by outcome", &["outcome"]).expect("register rul_training_runs_total"),
    stage_latency_ms: register_histogram_vec!("rul_stage_latency_ms", "Time spent per training stage (ms)", &["stage"], LATENCY_BUCKETS_MS.to_vec()).expect("register rul_stage_latency_ms"),
    promotions_total: register_int_counter!("rul_model_promotions_total", "Models written to a new registry version").expect("register rul_model_promotions_total"),
    rejections_total: register_int_counter!("rul_model_rejections_total", "Candidates refused by the promotion gate").expect("register rul_model_rejections_total"),
    predictions_total: register_int_counter_vec!("rul_batch_predictions_total", "Batch prediction jobs by outcome", &["outcome"]).expect("register rul_batch_predictions_total"),
    predicted_rows_total: register_int_counter!("rul_predicted_rows_total", "Rows scored by batch prediction").expect("register rul_predicted_rows_total"),
});

/// Label used for the `outcome` dimension: `ok` or the error kind.
pub fn outcome<T>(r: &crate::Result<T>) -> &'static str {
    match r { Ok(_) => "ok", Err(e) => e.kind() }
}

/// Text exposition of every metric in the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    Lazy::force(&METRICS);
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_families() {
        METRICS.runs_total.with_label_values(&["ok"]).inc();
        METRICS.stage_latency_ms.with_label_values(&["ingested"]).observe(3.0);
        let text = render().unwrap();
        assert!(text.contains("rul_training_runs_total"));
        assert!(text.contains("rul_stage_latency_ms_bucket"));
    }

    #[test]
    fn outcome_labels() {
        let ok: crate::Result<()> = Ok(());
        let err: crate::Result<()> = Err(crate::RulError::SchemaMismatch("x".into()));
        assert_eq!(outcome(&ok), "ok");
        assert_eq!(outcome(&err), "schema_mismatch");
    }
}
