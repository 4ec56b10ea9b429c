//! Defines routes for the podcast generation API.
//!
//! ## Structure
//! - `GET  /` — HTML landing page with the upload form
//! - `POST /generate-podcast/` — upload a document, run one conversion job
//! - `GET  /download-podcast/{filename}` — fetch a final audio artifact
//! - `GET  /health` — liveness
//! - `GET  /readyz` — staging-area readiness
//! - `/podcast/*` — read-only static mount of produced artifacts
//!   (final files and segment directories), served directly by path.

use crate::{
    handlers::{
        health_handlers::{health, readyz},
        podcast_handlers::{download_podcast, generate_podcast, root},
    },
    services::podcast_service::PodcastService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::path::Path;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Uploads larger than this are refused outright.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the router for the full API surface.
///
/// The router carries shared state (`PodcastService`) to all handlers; the
/// static artifact mount serves straight from disk and needs none.
pub fn routes(podcast_dir: &Path) -> Router<PodcastService> {
    Router::new()
        .route("/", get(root))
        .route(
            "/generate-podcast/",
            post(generate_podcast).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/download-podcast/{filename}", get(download_podcast))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .nest_service("/podcast", ServeDir::new(podcast_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
