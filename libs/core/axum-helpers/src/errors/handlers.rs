use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use super::{ErrorCode, ErrorResponse};

/// Router fallback: answers unknown routes with the standard JSON error body.
pub async fn not_found(uri: Uri) -> Response {
    let body = ErrorResponse::new(
        ErrorCode::NotFound,
        format!("No route for {}", uri.path()),
    );

    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
