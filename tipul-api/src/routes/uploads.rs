//! Authenticated download of stored uploads
//!
//! `GET /v1/uploads/*path` serves `<UPLOADS_DIR>/<path>`. Paths that would
//! leave the uploads directory are 403, missing files 404.

use crate::{app::AppState, error::ApiResult};
use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use tipul_shared::storage::content_type_for;

pub const CACHE_CONTROL: &str = "private, max-age=3600";

pub async fn serve_upload(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> ApiResult<Response> {
    let bytes = state.storage.read(&path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(&path).to_string()),
            (header::CONTENT_LENGTH, bytes.len().to_string()),
            (header::CACHE_CONTROL, CACHE_CONTROL.to_string()),
        ],
        Body::from(bytes),
    )
        .into_response())
}
