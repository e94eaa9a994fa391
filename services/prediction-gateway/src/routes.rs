use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::RwLock;
use rul_core::{start_batch_prediction, start_training_pipeline, telemetry, Frame, RulConfig, RulError};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::html;

#[derive(Clone)]
pub struct AppState {
    cfg: Arc<RulConfig>,
    last_prediction: Arc<RwLock<Option<PathBuf>>>,
    // Held for the whole training run; the registry expects one writer.
    training: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(cfg: RulConfig) -> Self {
        Self { cfg: Arc::new(cfg), last_prediction: Arc::new(RwLock::new(None)), training: Arc::new(Mutex::new(())) }
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("busy: {0}")]
    Busy(String),
    #[error(transparent)]
    Core(#[from] RulError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::BadRequest(msg) => {
                warn!(%msg, "rejected request");
                (StatusCode::BAD_REQUEST, Html(html::message("Bad request", &msg))).into_response()
            }
            GatewayError::Busy(msg) => {
                info!(%msg, "request deferred");
                (StatusCode::CONFLICT, Html(html::message("Busy", &msg))).into_response()
            }
            other => {
                error!(error = %other, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, Html(html::message("Something went wrong", "The request could not be completed. Check the service logs for details."))).into_response()
            }
        }
    }
}

pub fn app(state: AppState) -> Router {
    let limit = state.cfg.server.max_upload_bytes;
    Router::new()
        .route("/", get(index).post(upload))
        .route("/predict", get(predict))
        .route("/download", get(download))
        .route("/train", post(train))
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state)
}

/// Reduce a client-supplied name to a bare file name of `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let base = Path::new(raw).file_name()?.to_string_lossy().into_owned();
    let clean: String = base.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')).collect();
    let clean = clean.trim_start_matches('.').to_string();
    (!clean.is_empty()).then_some(clean)
}

async fn index() -> Html<String> { Html(html::upload_form()) }

async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> Result<Redirect, GatewayError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| GatewayError::BadRequest(format!("multipart error: {e}")))? {
        let Some(raw_name) = field.file_name().map(str::to_string) else { continue };
        let name = sanitize_file_name(&raw_name).ok_or_else(|| GatewayError::BadRequest(format!("unusable file name {raw_name:?}")))?;
        let data = field.bytes().await.map_err(|e| GatewayError::BadRequest(format!("upload read error: {e}")))?;
        if data.is_empty() { return Err(GatewayError::BadRequest("uploaded file is empty".into())); }
        let dir = &state.cfg.server.upload_dir;
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(dir.join(&name), &data).await?;
        info!(file = %name, bytes = data.len(), "upload stored");
        return Ok(Redirect::to(&format!("/predict?file={name}")));
    }
    Err(GatewayError::BadRequest("no file in upload".into()))
}

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    file: Option<String>,
}

async fn predict(State(state): State<AppState>, Query(q): Query<PredictQuery>) -> Result<Html<String>, GatewayError> {
    let input = match q.file.as_deref() {
        Some(f) => state.cfg.server.upload_dir.join(sanitize_file_name(f).ok_or_else(|| GatewayError::BadRequest(format!("unusable file name {f:?}")))?),
        None => state.cfg.prediction.default_input.clone(),
    };
    let cfg = state.cfg.clone();
    let (output, frame) = tokio::task::spawn_blocking(move || -> rul_core::Result<(PathBuf, Frame)> {
        let output = start_batch_prediction(&cfg, &input)?;
        let frame = Frame::read_csv(&output)?;
        Ok((output, frame))
    }).await??;
    *state.last_prediction.write() = Some(output);
    Ok(Html(html::prediction_table(&frame, state.cfg.server.preview_rows)))
}

async fn download(State(state): State<AppState>) -> Result<Response, GatewayError> {
    let Some(path) = state.last_prediction.read().clone() else {
        return Ok((StatusCode::NOT_FOUND, Html(html::message("Nothing to download", "Run a prediction first."))).into_response());
    };
    let bytes = tokio::fs::read(&path).await?;
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "prediction.csv".into());
    Ok(([(header::CONTENT_TYPE, "text/csv".to_string()), (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\""))], bytes).into_response())
}

async fn train(State(state): State<AppState>) -> Result<Html<String>, GatewayError> {
    let guard = state.training.clone().try_lock_owned().map_err(|_| GatewayError::Busy("A training run is already in progress. Try again when it finishes.".into()))?;
    let cfg = state.cfg.clone();
    // The guard moves into the worker so a dropped request cannot release it early.
    let run = tokio::task::spawn_blocking(move || {
        let _guard = guard;
        start_training_pipeline(&cfg)
    });
    match run.await? {
        Ok(art) => Ok(Html(html::message("Training complete", &format!("Model promoted as version {}.", art.pushed_version)))),
        Err(RulError::ModelRejected { candidate, latest }) => Ok(Html(html::message(
            "Training complete",
            &format!("Candidate r2 {candidate:.4} did not beat the current model ({latest:.4}); current model kept."),
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn metrics() -> Response {
    match telemetry::render() {
        Ok(text) => ([(header::CONTENT_TYPE, telemetry::CONTENT_TYPE)], text).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, format!("encode error: {e}")).into_response(),
    }
}
