use anyhow::Result;
use axum::Router;
use paper_podcast::{
    config::AppConfig,
    routes,
    services::{
        converter::CommandConverter,
        podcast_service::{ArtifactLayout, PodcastService},
    },
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting paper-podcast with config: {:?}", cfg);

    // --- Ensure artifact and staging directories exist ---
    let layout = ArtifactLayout::new(&cfg.podcast_dir);
    for dir in [layout.final_root(), layout.segments_root()] {
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
            tracing::info!("Created artifact directory at {}", dir.display());
        }
    }
    if !Path::new(&cfg.temp_dir).exists() {
        fs::create_dir_all(&cfg.temp_dir)?;
        tracing::info!("Created staging directory at {}", cfg.temp_dir);
    }

    // --- Initialize core service ---
    let converter = Arc::new(CommandConverter::new(&cfg.converter_cmd));
    let service = PodcastService::new(
        converter,
        layout.clone(),
        cfg.temp_dir.clone(),
        cfg.max_concurrent_jobs,
        Duration::from_secs(cfg.conversion_timeout_secs),
    );

    // --- Build router ---
    let app: Router = routes::routes::routes(layout.root()).with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
