use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{Map, Value};
use tracing::info;

use crate::models::{api_error, ApiError, SessionListResponse, SessionResponse};
use crate::AppState;

use super::form::{field_text, internal_error, invalid_field, next_field, state_error};

const SESSION_TEXT_FIELDS: [&str; 2] = ["Uid", "Name"];

/// List all sessions
pub async fn session_all(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionListResponse>), ApiError> {
    let data = state.coordinator.list_sessions(&[]).await.map_err(internal_error)?;
    Ok((StatusCode::OK, Json(SessionListResponse { data })))
}

/// Get a session by uid
pub async fn session_get(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    match state.coordinator.get_session(&uid).await.map_err(internal_error)? {
        Some(data) => Ok((StatusCode::OK, Json(SessionResponse { data }))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Session not found")),
    }
}

/// Add a session from a multipart form with `Uid` and `Name`
pub async fn session_add(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let mut multipart = multipart.map_err(|_| api_error(StatusCode::BAD_REQUEST, "Form data required"))?;

    let mut data = Map::new();
    while let Some(field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();
        if !SESSION_TEXT_FIELDS.contains(&name.as_str()) {
            return Err(invalid_field(&name));
        }
        let text = field_text(field, &name).await?;
        data.insert(name, Value::String(text));
    }

    let session = state
        .coordinator
        .add_session(&data)
        .await
        .map_err(|e| state_error(e, "Invalid session data"))?;
    state.hub.session_added(&session, None).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a session with all of its objects
pub async fn session_delete(State(state): State<AppState>, Path(uid): Path<String>) -> Result<StatusCode, ApiError> {
    if !state.coordinator.can_remove_session(&uid) {
        return Err(api_error(StatusCode::FORBIDDEN, "Session cannot be deleted"));
    }
    if !state.coordinator.remove_session(&uid).await.map_err(internal_error)? {
        return Err(api_error(StatusCode::NOT_FOUND, "Session not found"));
    }
    info!("Session '{}' removed", uid);
    state.hub.session_removed(&uid, None).await;
    Ok(StatusCode::NO_CONTENT)
}
