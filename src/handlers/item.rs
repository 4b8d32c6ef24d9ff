use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

use crate::models::{api_error, ApiError, ObjectListResponse, ObjectResponse};
use crate::AppState;

use super::form::internal_error;

/// Get an object by uid
pub async fn item_get(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<(StatusCode, Json<ObjectResponse>), ApiError> {
    match state.coordinator.get_object(&uid).await.map_err(internal_error)? {
        Some(data) => Ok((StatusCode::OK, Json(ObjectResponse { data }))),
        None => Err(api_error(StatusCode::NOT_FOUND, "Object not found")),
    }
}

/// List the objects of a session
pub async fn item_all(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<ObjectListResponse>), ApiError> {
    let data = state.coordinator.list_objects(&session).await.map_err(internal_error)?;
    Ok((StatusCode::OK, Json(ObjectListResponse { data })))
}

/// Stream the content of a file object
pub async fn item_download(
    State(state): State<AppState>,
    Path(uid): Path<String>,
    request: Request,
) -> Result<Response, ApiError> {
    let Some(path) = state.coordinator.get_object_file(&uid).await.map_err(internal_error)? else {
        return Err(api_error(StatusCode::NOT_FOUND, "Object not found"));
    };
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => Ok(response.map(Body::new).into_response()),
        Err(never) => match never {},
    }
}

/// Remove an object and its content
pub async fn item_delete(State(state): State<AppState>, Path(uid): Path<String>) -> Result<StatusCode, ApiError> {
    if !state.coordinator.remove_object(&uid).await.map_err(internal_error)? {
        return Err(api_error(StatusCode::NOT_FOUND, "Object not found"));
    }
    state.hub.item_removed(&uid, None).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Remove every object of a session, announcing each removal
pub async fn item_all_delete(State(state): State<AppState>, Path(session): Path<String>) -> Result<StatusCode, ApiError> {
    let uids = state
        .coordinator
        .list_object_uids(&session)
        .await
        .map_err(internal_error)?;
    state
        .coordinator
        .clear_session(&session)
        .await
        .map_err(internal_error)?;
    info!("Cleared {} objects from session '{}'", uids.len(), session);
    for uid in uids {
        state.hub.item_removed(&uid, None).await;
    }
    Ok(StatusCode::NO_CONTENT)
}
