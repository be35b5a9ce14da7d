use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fields shared by every object variant.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ObjectCommon {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributed_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<Tag>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachment: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "inReplyTo")]
    pub in_reply_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    #[serde(rename = "type")]
    pub kind: TagKind,
    pub href: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagKind {
    Hashtag,
    Mention,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Place {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventExtra {
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "startTime")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "endTime")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Place>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VideoExtra {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TombstoneFields {
    pub id: String,
    #[serde(rename = "formerType")]
    pub former_type: String,
    pub deleted: DateTime<Utc>,
}

/// An ActivityStreams object. Internally tagged on `type`, so the Rust
/// variant name doubles as the wire discriminant for every case except
/// the actor variants, which wrap [`super::Actor`] directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Object {
    Note(ObjectCommon),
    Article(ObjectCommon),
    Page(ObjectCommon),
    Image(ObjectCommon),
    Audio(ObjectCommon),
    Document(ObjectCommon),
    Event(EventObject),
    Video(VideoObject),
    Tombstone(TombstoneFields),
    Person(Box<super::Actor>),
    Group(Box<super::Actor>),
    Application(Box<super::Actor>),
    Service(Box<super::Actor>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventObject {
    #[serde(flatten)]
    pub common: ObjectCommon,
    #[serde(flatten)]
    pub extra: EventExtra,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoObject {
    #[serde(flatten)]
    pub common: ObjectCommon,
    #[serde(flatten)]
    pub extra: VideoExtra,
}

impl Object {
    pub fn id(&self) -> &str {
        match self {
            Object::Note(c) | Object::Article(c) | Object::Page(c) | Object::Image(c)
            | Object::Audio(c) | Object::Document(c) => &c.id,
            Object::Event(e) => &e.common.id,
            Object::Video(v) => &v.common.id,
            Object::Tombstone(t) => &t.id,
            Object::Person(a) | Object::Group(a) | Object::Application(a) | Object::Service(a) => {
                &a.id
            }
        }
    }

    pub fn common(&self) -> Option<&ObjectCommon> {
        match self {
            Object::Note(c) | Object::Article(c) | Object::Page(c) | Object::Image(c)
            | Object::Audio(c) | Object::Document(c) => Some(c),
            Object::Event(e) => Some(&e.common),
            Object::Video(v) => Some(&v.common),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Note(_) => "Note",
            Object::Article(_) => "Article",
            Object::Page(_) => "Page",
            Object::Image(_) => "Image",
            Object::Audio(_) => "Audio",
            Object::Document(_) => "Document",
            Object::Event(_) => "Event",
            Object::Video(_) => "Video",
            Object::Tombstone(_) => "Tombstone",
            Object::Person(_) => "Person",
            Object::Group(_) => "Group",
            Object::Application(_) => "Application",
            Object::Service(_) => "Service",
        }
    }
}
