//! Health & readiness handlers.
//!
//! - GET /health  -> simple liveness ({"status": "healthy"})
//! - GET /readyz  -> readiness that checks staging-area disk I/O

use crate::services::podcast_service::PodcastService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

/// `GET /health`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON body.
/// This endpoint should be cheap and never perform I/O.
pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that performs a best-effort write/read/delete against
/// the staging root, since every job begins with a write there.
///
/// HTTP 200 when the check passes, HTTP 503 when it fails.
pub async fn readyz(State(service): State<PodcastService>) -> impl IntoResponse {
    let disk_check = check_disk(&service).await;

    let (ok, error) = match disk_check {
        Ok(()) => (true, None),
        Err(msg) => (false, Some(msg)),
    };

    let body = ReadyResponse {
        status: if ok { "ok".into() } else { "error".into() },
        disk: CheckStatus { ok, error },
    };

    let status = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn check_disk(service: &PodcastService) -> Result<(), String> {
    let tmp_path = service.temp_dir().join(format!(".readyz-{}", Uuid::new_v4()));

    if let Err(e) = fs::create_dir_all(service.temp_dir()).await {
        return Err(format!("could not create staging dir: {}", e));
    }
    if let Err(e) = fs::write(&tmp_path, b"readyz").await {
        return Err(format!("could not write tmp file: {}", e));
    }
    let outcome = match fs::read(&tmp_path).await {
        Ok(bytes) if bytes == b"readyz" => Ok(()),
        Ok(_) => Err("file content mismatch".to_string()),
        Err(e) => Err(format!("could not read tmp file: {}", e)),
    };
    let _ = fs::remove_file(&tmp_path).await; // best-effort cleanup
    outcome
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    disk: CheckStatus,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
