//! Builders for the outbound activity envelopes this core emits. Each
//! wraps an object/target in the right `Activity` shape with a fresh id.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::Config,
    model::{self, Activity, ActivityKind, Object, ObjectRef, AP_PUBLIC},
};

/// `{base}/ap/activities/{type-lowercase}/{slug}-{epoch-ms}`, monotone per
/// slug under normal wall-clock behavior. Activities with no natural slug
/// of their own (Follow, Like, Accept, ...) use a fresh uuid as the slug.
fn new_id(config: &Config, kind: ActivityKind, slug: &str) -> String {
    format!(
        "{}/ap/activities/{}/{}-{}",
        config.site_base_url,
        kind.as_str().to_lowercase(),
        slug,
        Utc::now().timestamp_millis()
    )
}

fn base(config: &Config, kind: ActivityKind, actor_uri: &str) -> Activity {
    base_with_slug(config, kind, actor_uri, &Uuid::new_v4().to_string())
}

fn base_with_slug(config: &Config, kind: ActivityKind, actor_uri: &str, slug: &str) -> Activity {
    Activity {
        context: model::activitystreams_context(),
        id: new_id(config, kind, slug),
        kind,
        actor: ObjectRef::Id(actor_uri.to_owned()),
        object: None,
        target: None,
        origin: None,
        result: None,
        instrument: None,
        published: Some(Utc::now()),
        to: vec![],
        cc: vec![],
        bto: vec![],
        bcc: vec![],
    }
}

/// The last path segment of an AS2 object's id, used as the slug in an
/// activity's own id.
fn slug_of(object: &Object) -> &str {
    object.id().rsplit('/').next().unwrap_or(object.id())
}

pub fn create(config: &Config, actor_uri: &str, object: Object, to: Vec<String>, cc: Vec<String>) -> Activity {
    let mut activity = base_with_slug(config, ActivityKind::Create, actor_uri, slug_of(&object));
    activity.to = to;
    activity.cc = cc;
    activity.object = Some(ObjectRef::Object(Box::new(object)));
    activity
}

pub fn update(config: &Config, actor_uri: &str, object: Object, to: Vec<String>, cc: Vec<String>) -> Activity {
    let mut activity = base_with_slug(config, ActivityKind::Update, actor_uri, slug_of(&object));
    activity.to = to;
    activity.cc = cc;
    activity.object = Some(ObjectRef::Object(Box::new(object)));
    activity
}

/// Wraps a `Tombstone` in a `Delete`, addressed the same as the object it replaces.
pub fn delete(config: &Config, actor_uri: &str, tombstone: Object, to: Vec<String>, cc: Vec<String>) -> Activity {
    let mut activity = base_with_slug(config, ActivityKind::Delete, actor_uri, slug_of(&tombstone));
    activity.to = to;
    activity.cc = cc;
    activity.object = Some(ObjectRef::Object(Box::new(tombstone)));
    activity
}

pub fn follow(config: &Config, actor_uri: &str, target_actor_uri: &str) -> Activity {
    let mut activity = base(config, ActivityKind::Follow, actor_uri);
    activity.object = Some(ObjectRef::Id(target_actor_uri.to_owned()));
    activity.to = vec![target_actor_uri.to_owned()];
    activity
}

pub fn like(config: &Config, actor_uri: &str, object_id: &str) -> Activity {
    let mut activity = base(config, ActivityKind::Like, actor_uri);
    activity.object = Some(ObjectRef::Id(object_id.to_owned()));
    activity.to = vec![AP_PUBLIC.to_owned()];
    activity.cc = vec![format!("{actor_uri}/followers")];
    activity
}

pub fn announce(config: &Config, actor_uri: &str, object_id: &str) -> Activity {
    let mut activity = base(config, ActivityKind::Announce, actor_uri);
    activity.object = Some(ObjectRef::Id(object_id.to_owned()));
    activity.to = vec![AP_PUBLIC.to_owned()];
    activity.cc = vec![format!("{actor_uri}/followers")];
    activity
}

/// Wraps a previously-issued activity (by id) in an `Undo`, addressed the
/// same way the original was.
pub fn undo(config: &Config, actor_uri: &str, original_activity: &Activity) -> Activity {
    let mut activity = base(config, ActivityKind::Undo, actor_uri);
    activity.object = Some(ObjectRef::Id(original_activity.id.clone()));
    activity.to = original_activity.to.clone();
    activity.cc = original_activity.cc.clone();
    activity
}

/// `object` embeds the original `Follow` in full, per the Accept/Reject shape.
pub fn accept(config: &Config, actor_uri: &str, follow_activity: &Activity, requester_uri: &str) -> Activity {
    let mut activity = base(config, ActivityKind::Accept, actor_uri);
    activity.object = Some(ObjectRef::Raw(
        serde_json::to_value(follow_activity).expect("Activity always serializes"),
    ));
    activity.to = vec![requester_uri.to_owned()];
    activity
}

pub fn reject(config: &Config, actor_uri: &str, follow_activity: &Activity, requester_uri: &str) -> Activity {
    let mut activity = base(config, ActivityKind::Reject, actor_uri);
    activity.object = Some(ObjectRef::Raw(
        serde_json::to_value(follow_activity).expect("Activity always serializes"),
    ));
    activity.to = vec![requester_uri.to_owned()];
    activity
}
