use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Object;
use crate::{Error, Result};

/// The fourteen activity types this core knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    Create,
    Update,
    Delete,
    Add,
    Remove,
    Move,
    Follow,
    Like,
    Announce,
    Undo,
    Accept,
    Reject,
    Block,
    Flag,
}

impl ActivityKind {
    /// Whether this activity type is required to carry an `object` field.
    pub fn requires_object(self) -> bool {
        use ActivityKind::*;
        matches!(
            self,
            Create | Update | Delete | Like | Announce | Follow | Accept | Reject | Undo
        )
    }

    /// The `type` string as it appears on the wire, e.g. `"Create"`.
    pub fn as_str(self) -> &'static str {
        use ActivityKind::*;
        match self {
            Create => "Create",
            Update => "Update",
            Delete => "Delete",
            Add => "Add",
            Remove => "Remove",
            Move => "Move",
            Follow => "Follow",
            Like => "Like",
            Announce => "Announce",
            Undo => "Undo",
            Accept => "Accept",
            Reject => "Reject",
            Block => "Block",
            Flag => "Flag",
        }
    }
}

/// `actor`/`object`/`target` may be a bare URI, an embedded document, or
/// (for `object`) a list of either. `Raw` is a last-resort fallback for
/// embedded activities (e.g. the `Follow`/`Like`/`Announce` an `Undo`
/// targets) that don't deserialize as an AS2 `Object` at all; being an
/// `untagged` enum, it must stay the last variant so it only catches what
/// the others don't.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Object(Box<Object>),
    Many(Vec<ObjectRef>),
    Raw(serde_json::Value),
}

impl ObjectRef {
    /// The id of this reference: the URI itself, or the embedded object's id.
    pub fn id(&self) -> Option<&str> {
        match self {
            ObjectRef::Id(id) => Some(id),
            ObjectRef::Object(obj) => Some(obj.id()),
            ObjectRef::Many(items) => items.first().and_then(|i| i.id()),
            ObjectRef::Raw(value) => value.get("id").and_then(|v| v.as_str()),
        }
    }

    pub fn embedded(&self) -> Option<&Object> {
        match self {
            ObjectRef::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// The `type` of an embedded raw activity, when this reference didn't
    /// deserialize into a known `Object` variant.
    pub fn raw_type(&self) -> Option<&str> {
        match self {
            ObjectRef::Raw(value) => value.get("type").and_then(|v| v.as_str()),
            _ => None,
        }
    }

    /// The `object` field nested inside an embedded raw activity (e.g. the
    /// liked/boosted object id inside a `Like`/`Announce` an `Undo` targets).
    pub fn raw_object_id(&self) -> Option<&str> {
        match self {
            ObjectRef::Raw(value) => value
                .get("object")
                .and_then(|o| o.as_str().or_else(|| o.get("id").and_then(|v| v.as_str()))),
            _ => None,
        }
    }
}

/// An immutable ActivityPub envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub actor: ObjectRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instrument: Option<ObjectRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bto: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bcc: Vec<String>,
}

impl Activity {
    /// The URI of the actor who issued this activity, whether embedded or referenced.
    pub fn actor_id(&self) -> &str {
        match &self.actor {
            ObjectRef::Id(id) => id,
            ObjectRef::Object(obj) => obj.id(),
            ObjectRef::Many(items) => items.first().and_then(|i| i.id()).unwrap_or_default(),
            ObjectRef::Raw(value) => value.get("id").and_then(|v| v.as_str()).unwrap_or_default(),
        }
    }

    /// Validates the envelope against the invariants in the data model:
    /// `id`/`type`/`actor` present, `object` present where required, and at
    /// least one of `to`/`cc` set.
    pub fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::BadRequest("activity missing id".into()));
        }
        if self.actor_id().is_empty() {
            return Err(Error::BadRequest("activity missing actor".into()));
        }
        if self.kind.requires_object() && self.object.is_none() {
            return Err(Error::BadRequest(format!(
                "{:?} activity requires an object",
                self.kind
            )));
        }
        Ok(())
    }
}
