use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event names carried in the `Event` field of every WebSocket frame
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ItemAdded,
    ItemMoved,
    ItemRemoved,
    ItemSelectionChanged,
    SessionAdded,
    SessionRemoved,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ItemAdded => "ITEM_ADDED",
            EventKind::ItemMoved => "ITEM_MOVED",
            EventKind::ItemRemoved => "ITEM_REMOVED",
            EventKind::ItemSelectionChanged => "ITEM_SELECTION_CHANGED",
            EventKind::SessionAdded => "SESSION_ADDED",
            EventKind::SessionRemoved => "SESSION_REMOVED",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no Event field")]
    MissingEvent,
    #[error("unknown event {0}")]
    UnknownEvent(String),
    #[error("frame has no Uid field")]
    MissingUid,
}

/// A decoded inbound frame. `body` keeps every field as received so the
/// frame can be relayed verbatim once it has been applied.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub event: EventKind,
    pub uid: String,
    pub body: Map<String, Value>,
}

impl Envelope {
    pub fn parse(text: &str) -> Result<Self, EnvelopeError> {
        let body = match serde_json::from_str::<Value>(text)? {
            Value::Object(map) => map,
            _ => return Err(EnvelopeError::NotAnObject),
        };
        let event = match body.get("Event") {
            Some(Value::String(name)) => serde_json::from_value::<EventKind>(Value::String(name.clone()))
                .map_err(|_| EnvelopeError::UnknownEvent(name.clone()))?,
            Some(other) => return Err(EnvelopeError::UnknownEvent(other.to_string())),
            None => return Err(EnvelopeError::MissingEvent),
        };
        let uid = match body.get("Uid") {
            Some(Value::String(uid)) => uid.clone(),
            _ => return Err(EnvelopeError::MissingUid),
        };
        Ok(Self { event, uid, body })
    }

    /// `IsSelected` flag of a selection frame
    pub fn is_selected(&self) -> Option<bool> {
        self.body.get("IsSelected").and_then(Value::as_bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_selection_frame() {
        let envelope = Envelope::parse(r#"{"Event":"ITEM_SELECTION_CHANGED","Uid":"o1","IsSelected":true,"Seq":3}"#).unwrap();
        assert_eq!(envelope.event, EventKind::ItemSelectionChanged);
        assert_eq!(envelope.uid, "o1");
        assert_eq!(envelope.is_selected(), Some(true));
        assert_eq!(envelope.body.get("Seq"), Some(&Value::from(3)));
    }

    #[test]
    fn rejects_malformed_frames() {
        assert!(matches!(Envelope::parse("not json"), Err(EnvelopeError::Json(_))));
        assert!(matches!(Envelope::parse("[1,2]"), Err(EnvelopeError::NotAnObject)));
        assert!(matches!(Envelope::parse(r#"{"Uid":"o1"}"#), Err(EnvelopeError::MissingEvent)));
        assert!(matches!(
            Envelope::parse(r#"{"Event":"ITEM_EXPLODED","Uid":"o1"}"#),
            Err(EnvelopeError::UnknownEvent(_))
        ));
        assert!(matches!(Envelope::parse(r#"{"Event":"ITEM_MOVED"}"#), Err(EnvelopeError::MissingUid)));
    }

    #[test]
    fn event_names_round_trip_through_serde() {
        for kind in [EventKind::ItemAdded, EventKind::SessionRemoved, EventKind::ItemSelectionChanged] {
            assert_eq!(serde_json::to_value(kind).unwrap(), Value::String(kind.as_str().to_string()));
        }
    }
}
