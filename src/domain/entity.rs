use crate::error::{EnrollmentError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;

/// A record body as exchanged with the entity store: a flat JSON object.
pub type Fields = Map<String, Value>;

/// The entity types this crate reads and writes through the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Application,
    Member,
    Payment,
    ApprovalJournal,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Application,
        EntityKind::Member,
        EntityKind::Payment,
        EntityKind::ApprovalJournal,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Member => "member",
            EntityKind::Payment => "payment",
            EntityKind::ApprovalJournal => "approval_journal",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A stored record. `fields` never contains the `id` key; it lives in `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub kind: EntityKind,
    pub id: String,
    pub fields: Fields,
}

impl EntityRecord {
    /// Deserializes the record into a typed entity, exposing the id as an `id` field.
    pub fn into_entity<T: DeserializeOwned>(self) -> Result<T> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Serializes a typed value into record fields.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(EnrollmentError::ValidationError(format!(
            "Entity fields must be an object, got {other}"
        ))),
    }
}

/// Pulls a caller-chosen key out of `fields`, if one was supplied.
pub fn take_id(fields: &mut Fields) -> Option<String> {
    match fields.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => Some(id),
        _ => None,
    }
}

/// Applies `patch` on top of `fields`, key by key.
pub fn merge_fields(fields: &mut Fields, patch: Fields) {
    for (key, value) in patch {
        if key != "id" {
            fields.insert(key, value);
        }
    }
}
