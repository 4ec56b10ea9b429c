//! HTTP handlers for podcast generation and retrieval.
//! Extracts the multipart upload and delegates all job orchestration to
//! `PodcastService`; downloads stream from disk without buffering.

use crate::{
    errors::AppError, models::response::PodcastResponse,
    services::podcast_service::PodcastService,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, Response},
};
use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
    <head>
        <title>Research Paper Multimedia Converter</title>
    </head>
    <body>
        <h1>Research Paper Multimedia Converter</h1>
        <form action="/generate-podcast/" method="post" enctype="multipart/form-data">
            <input type="file" name="file" accept=".pdf" required>
            <button type="submit">Generate Podcast</button>
        </form>
    </body>
</html>
"#;

/// GET `/` — static landing page with the upload form.
pub async fn root() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

/// POST `/generate-podcast/` — accept one document in the `file` multipart
/// field and run the conversion job to completion.
pub async fn generate_podcast(
    State(service): State<PodcastService>,
    mut multipart: Multipart,
) -> Result<Json<PodcastResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(format!("invalid multipart body: {err}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|err| AppError::bad_request(format!("failed to read upload: {err}")))?;
            upload = Some((filename, data));
        } else {
            warn!("ignoring unknown multipart field: {}", name);
        }
    }

    let (filename, data) =
        upload.ok_or_else(|| AppError::bad_request("missing `file` field in multipart body"))?;
    info!(filename, size_bytes = data.len(), "podcast generation requested");

    let response = service.generate(&filename, data).await?;
    Ok(Json(response))
}

/// GET `/download-podcast/{filename}` — stream a final artifact.
pub async fn download_podcast(
    State(service): State<PodcastService>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let (file, len) = service.open_podcast(&filename).await?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&len.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    // filename was validated as a single path component by the lookup
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok(response)
}
