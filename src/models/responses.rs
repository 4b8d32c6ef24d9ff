use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{SceneObject, Session};

/// `{"data": ...}` body of a single-session read
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub data: Session,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    pub data: Vec<Session>,
}

/// `{"data": ...}` body of a single-object read
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ObjectResponse {
    pub data: SceneObject,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ObjectListResponse {
    pub data: Vec<SceneObject>,
}
