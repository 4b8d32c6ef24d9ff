use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::ValidationError;

/// Fields every object must carry, in the order they are checked.
pub const BASIC_FIELDS: [&str; 6] = ["Uid", "Session", "ObjectType", "Position", "Scale", "Rotation"];

/// Kind of a scene object. Each kind carries exactly one extra field.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    File,
    Link,
    Text,
}

impl ObjectType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "File" => Some(ObjectType::File),
            "Link" => Some(ObjectType::Link),
            "Text" => Some(ObjectType::Text),
            _ => None,
        }
    }

    /// Name of the type-specific field kept for this kind
    pub fn extra_field(self) -> &'static str {
        match self {
            ObjectType::File => "FileName",
            ObjectType::Link => "Url",
            ObjectType::Text => "Text",
        }
    }

    /// Whether objects of this kind must come with uploaded content
    pub fn needs_file(self) -> bool {
        matches!(self, ObjectType::File)
    }
}

/// Canonical stored record of an object placed in a session.
///
/// Only the extra field matching `object_type` is ever populated; the
/// others stay `None` and are left out of the serialized form.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct SceneObject {
    pub uid: String,
    pub session: String,
    pub object_type: ObjectType,
    #[schema(value_type = Vec<f64>)]
    pub position: [f64; 3],
    #[schema(value_type = Vec<f64>)]
    pub scale: [f64; 3],
    #[schema(value_type = Vec<f64>)]
    pub rotation: [f64; 4],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl SceneObject {
    pub fn to_payload(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A submitted object whose basic fields are present and typed, before the
/// storage-dependent checks (uid in use, session exists) have run.
#[derive(Debug, Clone)]
pub struct ObjectDraft<'a> {
    pub uid: &'a str,
    pub session: &'a str,
    data: &'a Map<String, Value>,
}

impl<'a> ObjectDraft<'a> {
    /// Check that every basic field is present and that `Uid` and `Session`
    /// are strings.
    pub fn new(data: &'a Map<String, Value>) -> Result<Self, ValidationError> {
        for field in BASIC_FIELDS {
            match data.get(field) {
                None | Some(Value::Null) => return Err(ValidationError::MissingField(field)),
                Some(_) => {}
            }
        }
        let uid = data.get("Uid").and_then(Value::as_str).ok_or(ValidationError::InvalidField("Uid"))?;
        let session = data
            .get("Session")
            .and_then(Value::as_str)
            .ok_or(ValidationError::InvalidField("Session"))?;
        Ok(Self { uid, session, data })
    }

    fn field(&self, name: &str) -> &'a Value {
        self.data.get(name).unwrap_or(&Value::Null)
    }

    /// Run the remaining field checks and reduce the submission to the
    /// canonical record: basic fields plus the extra field of its type.
    pub fn finish(self, has_file: bool) -> Result<SceneObject, ValidationError> {
        let object_type = match self.data.get("ObjectType") {
            Some(Value::String(name)) => {
                ObjectType::parse(name).ok_or_else(|| ValidationError::UnknownObjectType(name.clone()))?
            }
            Some(other) => return Err(ValidationError::UnknownObjectType(other.to_string())),
            None => return Err(ValidationError::MissingField("ObjectType")),
        };

        match (object_type.needs_file(), has_file) {
            (true, false) => return Err(ValidationError::MissingFile),
            (false, true) => return Err(ValidationError::UnexpectedFile),
            _ => {}
        }

        let position = parse_array::<3>("Position", self.field("Position"))?;
        let scale = parse_array::<3>("Scale", self.field("Scale"))?;
        let rotation = parse_array::<4>("Rotation", self.field("Rotation"))?;

        let extra_field = object_type.extra_field();
        let extra = match self.data.get(extra_field) {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(value.clone()),
            Some(_) => return Err(ValidationError::InvalidField(extra_field)),
        };
        if object_type.needs_file() && extra.is_none() {
            return Err(ValidationError::MissingField("FileName"));
        }

        let mut object = SceneObject {
            uid: self.uid.to_string(),
            session: self.session.to_string(),
            object_type,
            position,
            scale,
            rotation,
            file_name: None,
            url: None,
            text: None,
        };
        match object_type {
            ObjectType::File => object.file_name = extra,
            ObjectType::Link => object.url = extra,
            ObjectType::Text => object.text = extra,
        }
        Ok(object)
    }
}

/// A position/scale/rotation update in which every part is optional.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Transform {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<f64>>)]
    pub position: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<f64>>)]
    pub scale: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<f64>>)]
    pub rotation: Option<[f64; 4]>,
}

impl Transform {
    /// Validate raw JSON values. `None` and JSON `null` both mean "not supplied".
    /// The first malformed field rejects the whole transform.
    pub fn from_values(
        position: Option<&Value>,
        scale: Option<&Value>,
        rotation: Option<&Value>,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            position: parse_optional::<3>("Position", position)?,
            scale: parse_optional::<3>("Scale", scale)?,
            rotation: parse_optional::<4>("Rotation", rotation)?,
        })
    }

    /// Read the transform fields out of an event envelope
    pub fn from_message(message: &Map<String, Value>) -> Result<Self, ValidationError> {
        Self::from_values(message.get("Position"), message.get("Scale"), message.get("Rotation"))
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_none() && self.scale.is_none() && self.rotation.is_none()
    }

    /// Overwrite the parts of `self` that `other` supplies
    pub fn merge(&mut self, other: &Transform) {
        if let Some(position) = other.position {
            self.position = Some(position);
        }
        if let Some(scale) = other.scale {
            self.scale = Some(scale);
        }
        if let Some(rotation) = other.rotation {
            self.rotation = Some(rotation);
        }
    }

    pub fn apply_to(&self, object: &mut SceneObject) {
        if let Some(position) = self.position {
            object.position = position;
        }
        if let Some(scale) = self.scale {
            object.scale = scale;
        }
        if let Some(rotation) = self.rotation {
            object.rotation = rotation;
        }
    }

    pub fn to_payload(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn parse_optional<const N: usize>(field: &'static str, value: Option<&Value>) -> Result<Option<[f64; N]>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => parse_array::<N>(field, value).map(Some),
    }
}

fn parse_array<const N: usize>(field: &'static str, value: &Value) -> Result<[f64; N], ValidationError> {
    let invalid = || ValidationError::InvalidShape { field, expected: N };
    let items = value.as_array().ok_or_else(invalid)?;
    if items.len() != N {
        return Err(invalid());
    }
    let mut out = [0.0; N];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64().ok_or_else(invalid)?;
    }
    Ok(out)
}
