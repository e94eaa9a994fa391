use anyhow::Result;
use rul_core::{init_tracing, load_config};
use tokio::signal;
use tracing::info;

mod html;
mod routes;

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config("prediction-gateway")?;
    init_tracing("prediction-gateway", &cfg.log)?;
    tokio::fs::create_dir_all(&cfg.server.upload_dir).await?;
    let bind = cfg.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(%bind, "prediction gateway listening");
    axum::serve(listener, routes::app(routes::AppState::new(cfg)))
        .with_graceful_shutdown(async { let _ = signal::ctrl_c().await; })
        .await?;
    info!("shutdown");
    Ok(())
}
