use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// Storage-level entity identifier. A deployment fixes one representation
/// for all tables; mixing representations is a configuration error, not a
/// runtime feature.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Id {
    Long(i64),
    Uuid(Uuid),
    Text(String),
}

impl Id {
    pub fn kind(&self) -> IdKind {
        match self {
            Id::Long(_) => IdKind::Long,
            Id::Uuid(_) => IdKind::Uuid,
            Id::Text(_) => IdKind::Text,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Id::Long(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Id::Uuid(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Id::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Long(value) => write!(f, "{value}"),
            Id::Uuid(value) => write!(f, "{value}"),
            Id::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Long(value)
    }
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Id::Uuid(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::Text(value.to_string())
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Id::Long(value) => serializer.serialize_i64(*value),
            Id::Uuid(value) => serializer.serialize_str(&value.to_string()),
            Id::Text(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        match value {
            JsonValue::Number(number) => number
                .as_i64()
                .map(Id::Long)
                .ok_or_else(|| serde::de::Error::custom("id number out of range")),
            JsonValue::String(text) => Ok(Uuid::parse_str(&text)
                .map(Id::Uuid)
                .unwrap_or_else(|_| Id::Text(text))),
            _ => Err(serde::de::Error::custom("invalid id value")),
        }
    }
}

/// The identifier representation a deployment stores.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    Long,
    Uuid,
    Text,
}

impl Default for IdKind {
    fn default() -> Self {
        IdKind::Long
    }
}

/// Injective mapping between wire identifiers and storage identifiers,
/// supplied by deployment configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct IdCodec {
    kind: IdKind,
}

impl IdCodec {
    pub fn new(kind: IdKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn parse_wire(&self, raw: &str) -> StoreResult<Id> {
        match self.kind {
            IdKind::Long => raw
                .parse::<i64>()
                .map(Id::Long)
                .map_err(|err| StoreError::invalid_id(format!("invalid long id '{raw}': {err}"))),
            IdKind::Uuid => Uuid::parse_str(raw)
                .map(Id::Uuid)
                .map_err(|err| StoreError::invalid_id(format!("invalid uuid '{raw}': {err}"))),
            IdKind::Text => {
                if raw.is_empty() {
                    Err(StoreError::invalid_id("empty text id"))
                } else {
                    Ok(Id::Text(raw.to_string()))
                }
            }
        }
    }

    pub fn to_wire(&self, id: &Id) -> String {
        id.to_string()
    }

    /// `None` for the long representation, where the store's auto-increment
    /// column assigns the key.
    pub fn generate(&self) -> Option<Id> {
        match self.kind {
            IdKind::Long => None,
            IdKind::Uuid => Some(Id::Uuid(Uuid::new_v4())),
            IdKind::Text => Some(Id::Text(Uuid::new_v4().to_string())),
        }
    }

    pub fn accepts(&self, id: &Id) -> bool {
        id.kind() == self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::{Id, IdCodec, IdKind};

    #[test]
    fn wire_round_trips_every_kind() {
        let long = IdCodec::new(IdKind::Long);
        let id = long.parse_wire("42").expect("long parse");
        assert_eq!(id, Id::Long(42));
        assert_eq!(long.to_wire(&id), "42");

        let uuid = IdCodec::new(IdKind::Uuid);
        let generated = uuid.generate().expect("uuid generate");
        let parsed = uuid.parse_wire(&uuid.to_wire(&generated)).expect("uuid parse");
        assert_eq!(parsed, generated);

        let text = IdCodec::new(IdKind::Text);
        let id = text.parse_wire("station-7").expect("text parse");
        assert_eq!(id, Id::Text("station-7".to_string()));
    }

    #[test]
    fn wire_rejects_malformed_input() {
        assert!(IdCodec::new(IdKind::Long).parse_wire("forty-two").is_err());
        assert!(IdCodec::new(IdKind::Uuid).parse_wire("not-a-uuid").is_err());
        assert!(IdCodec::new(IdKind::Text).parse_wire("").is_err());
    }

    #[test]
    fn generate_matches_kind() {
        assert!(IdCodec::new(IdKind::Long).generate().is_none());
        let id = IdCodec::new(IdKind::Uuid).generate().expect("uuid");
        assert_eq!(id.kind(), IdKind::Uuid);
        assert!(IdCodec::new(IdKind::Uuid).accepts(&id));
        assert!(!IdCodec::new(IdKind::Long).accepts(&id));
    }
}
