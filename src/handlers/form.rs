use axum::extract::multipart::{Field, Multipart, MultipartError};
use axum::http::StatusCode;
use tracing::error;

use crate::models::{api_error, ApiError};
use crate::services::StateError;

/// Next part of a multipart body, with read failures mapped to 400
pub async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, ApiError> {
    multipart.next_field().await.map_err(bad_form)
}

pub async fn field_text(field: Field<'_>, name: &str) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, format!("Invalid field: {}", name)))
}

pub fn bad_form(e: MultipartError) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, format!("Invalid form data: {}", e))
}

pub fn invalid_field(name: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, format!("Invalid field: {}", name))
}

/// Map a coordinator failure: bad submissions are 400, backend failures 500
pub fn state_error(e: StateError, rejected: &str) -> ApiError {
    if e.is_rejection() {
        api_error(StatusCode::BAD_REQUEST, rejected)
    } else {
        internal_error(e)
    }
}

pub fn internal_error(e: StateError) -> ApiError {
    error!("Storage failure: {}", e);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
