use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::{ContentHash, validate_key};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Keys are never reused, so an object's ETag can be derived from its key.
fn etag_for(key: &str) -> String {
    format!("\"{}\"", ContentHash::compute(key.as_bytes()).to_hex())
}

#[utoipa::path(
    get,
    path = "/api/v1/media/{key}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Download a stored image",
    description = "Streams the object stored under `key`. Supports `If-None-Match`.",
    params(("key" = String, Path, description = "Object key, e.g. `2abc/1714564800000-k3j9x2ab-cat.png`")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 304, description = "Not modified"),
        (status = 400, description = "Malformed key (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "No such object (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn get_media(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    validate_key(&key)?;

    let etag_value = etag_for(&key);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.object_store.get_stream(&key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let content_type = mime_guess::from_path(&key)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".into());

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=86400, immutable")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}
