use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness endpoint
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Diagnostics endpoint
#[utoipa::path(
    get,
    path = "/diagnostics",
    responses(
        (status = 200, description = "Connection, selection and process statistics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// List all sessions
#[utoipa::path(
    get,
    path = "/session/all",
    tag = "session",
    responses(
        (status = 200, description = "All sessions", body = SessionListResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_all_doc() {}

/// Get one session
#[utoipa::path(
    get,
    path = "/session/{uid}",
    tag = "session",
    params(("uid" = String, Path, description = "Session uid")),
    responses(
        (status = 200, description = "The session", body = SessionResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_get_doc() {}

/// Add a session from multipart fields `Uid` and `Name`
#[utoipa::path(
    post,
    path = "/session/add",
    tag = "session",
    request_body(content = String, content_type = "multipart/form-data", description = "Fields `Uid` and `Name`"),
    responses(
        (status = 204, description = "Session added and broadcast"),
        (status = 400, description = "Invalid session data", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_add_doc() {}

/// Remove a session with all of its objects
#[utoipa::path(
    delete,
    path = "/session/{uid}",
    tag = "session",
    params(("uid" = String, Path, description = "Session uid")),
    responses(
        (status = 204, description = "Session removed and broadcast"),
        (status = 403, description = "The default session cannot be removed", body = ErrorResponse),
        (status = 404, description = "Session not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn session_delete_doc() {}

/// Get one object
#[utoipa::path(
    get,
    path = "/item/{uid}",
    tag = "item",
    params(("uid" = String, Path, description = "Object uid")),
    responses(
        (status = 200, description = "The object", body = ObjectResponse),
        (status = 404, description = "Object not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn item_get_doc() {}

/// List the objects of a session
#[utoipa::path(
    get,
    path = "/item/all/{session}",
    tag = "item",
    params(("session" = String, Path, description = "Session uid")),
    responses(
        (status = 200, description = "Objects in the session", body = ObjectListResponse)
    )
)]
#[allow(dead_code)]
pub async fn item_all_doc() {}

/// Download the content of a File object
#[utoipa::path(
    get,
    path = "/item/download/{uid}",
    tag = "item",
    params(("uid" = String, Path, description = "Object uid")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Object or file not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn item_download_doc() {}

/// Add an object from a multipart form
#[utoipa::path(
    post,
    path = "/item/add",
    tag = "item",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Text fields `Uid`, `Session`, `ObjectType`, `FileName`, `Url`, `Text`; JSON fields `Position`, `Scale`, `Rotation`; file part `FileContent`"
    ),
    responses(
        (status = 204, description = "Object added and broadcast"),
        (status = 400, description = "Invalid object data", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn item_add_doc() {}

/// Remove one object
#[utoipa::path(
    delete,
    path = "/item/{uid}",
    tag = "item",
    params(("uid" = String, Path, description = "Object uid")),
    responses(
        (status = 204, description = "Object removed and broadcast"),
        (status = 404, description = "Object not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn item_delete_doc() {}

/// Remove every object of a session
#[utoipa::path(
    delete,
    path = "/item/all/{session}",
    tag = "item",
    params(("session" = String, Path, description = "Session uid")),
    responses(
        (status = 204, description = "Objects removed, one broadcast each")
    )
)]
#[allow(dead_code)]
pub async fn item_all_delete_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        session_all_doc,
        session_get_doc,
        session_add_doc,
        session_delete_doc,
        item_get_doc,
        item_all_doc,
        item_download_doc,
        item_add_doc,
        item_delete_doc,
        item_all_delete_doc,
    ),
    components(
        schemas(
            HealthResponse,
            DiagnosticsResponse,
            ErrorResponse,
            Session,
            SceneObject,
            ObjectType,
            Transform,
            SessionResponse,
            SessionListResponse,
            ObjectResponse,
            ObjectListResponse
        )
    ),
    tags(
        (name = "session", description = "Scene sessions"),
        (name = "item", description = "Scene objects")
    )
)]
pub struct ApiDoc;
