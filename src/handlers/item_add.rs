use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
};
use serde_json::{Map, Value};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};

use crate::db::UploadedFile;
use crate::models::{api_error, ApiError};
use crate::utils::scope_guard::discard_upload_on_drop;
use crate::AppState;

use super::form::{bad_form, field_text, invalid_field, next_field, state_error};

const TEXT_FIELDS: [&str; 6] = ["Uid", "Session", "ObjectType", "FileName", "Url", "Text"];
const JSON_FIELDS: [&str; 3] = ["Position", "Scale", "Rotation"];
const FILE_FIELD: &str = "FileContent";

/// Add an object from a multipart form.
///
/// `Position`, `Scale` and `Rotation` parts are JSON; a `File` object sends
/// its content in a `FileContent` part after its `ObjectType`.
pub async fn item_add(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<StatusCode, ApiError> {
    let mut multipart = multipart.map_err(|_| api_error(StatusCode::BAD_REQUEST, "Form data required"))?;

    let mut data = Map::new();
    let mut upload: Option<UploadedFile> = None;
    let mut discard = None;

    while let Some(mut field) = next_field(&mut multipart).await? {
        let name = field.name().unwrap_or_default().to_string();

        if JSON_FIELDS.contains(&name.as_str()) {
            let text = field_text(field, &name).await?;
            let value: Value = serde_json::from_str(&text).map_err(|_| invalid_field(&name))?;
            data.insert(name, value);
        } else if TEXT_FIELDS.contains(&name.as_str()) {
            let text = field_text(field, &name).await?;
            data.insert(name, Value::String(text));
        } else if name == FILE_FIELD
            && upload.is_none()
            && data.get("ObjectType").and_then(Value::as_str) == Some("File")
        {
            // An explicit FileName wins over the name the upload came with
            let file_name = match data.get("FileName").and_then(Value::as_str) {
                Some(file_name) => file_name.to_string(),
                None => match field.file_name() {
                    Some(file_name) => file_name.to_string(),
                    None => return Err(api_error(StatusCode::BAD_REQUEST, "File name unknown")),
                },
            };
            data.insert("FileName".into(), Value::String(file_name));

            let path = state
                .coordinator
                .engine()
                .files()
                .staging_path()
                .await
                .map_err(|e| {
                    error!("Failed to create a staging file: {}", e);
                    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
                })?;
            discard = Some(discard_upload_on_drop(path.clone()));

            let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
                error!("Failed to create {}: {}", path.display(), e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
            })?;
            while let Some(chunk) = field.chunk().await.map_err(bad_form)? {
                file.write_all(&chunk).await.map_err(|e| {
                    error!("Failed to write file content to {}: {}", path.display(), e);
                    api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
                })?;
            }
            file.flush().await.map_err(|e| {
                error!("Failed to flush {}: {}", path.display(), e);
                api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store upload")
            })?;
            debug!("Staged upload at {}", path.display());
            upload = Some(UploadedFile { path });
        } else {
            return Err(invalid_field(&name));
        }
    }

    let object = state
        .coordinator
        .add_object(&data, upload.as_ref())
        .await
        .map_err(|e| state_error(e, "Invalid object data"))?;
    if let Some(discard) = discard {
        discard.disarm();
    }
    state.hub.item_added(&object, None).await;
    Ok(StatusCode::NO_CONTENT)
}
