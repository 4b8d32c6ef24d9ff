use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::ValidationError;

/// Uid of the session that always exists and can never be removed
pub const DEFAULT_SESSION: &str = "default";

/// A named scene that objects are placed in
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Session {
    pub uid: String,
    pub name: String,
}

impl Session {
    pub fn new(uid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: name.into(),
        }
    }

    /// Build a session from submitted fields. Anything besides `Uid` and
    /// `Name` is ignored.
    pub fn from_fields(data: &Map<String, Value>) -> Result<Self, ValidationError> {
        let uid = required_string(data, "Uid")?;
        let name = required_string(data, "Name")?;
        Ok(Self::new(uid, name))
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("Uid".into(), Value::String(self.uid.clone()));
        map.insert("Name".into(), Value::String(self.name.clone()));
        map
    }
}

fn required_string<'a>(data: &'a Map<String, Value>, field: &'static str) -> Result<&'a str, ValidationError> {
    match data.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(Value::String(value)) => Ok(value),
        Some(_) => Err(ValidationError::InvalidField(field)),
    }
}
