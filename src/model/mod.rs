//! ActivityStreams / ActivityPub wire types.
//!
//! These are the typed envelopes handlers dispatch on. JSON arrives
//! untyped; [`crate::Error::BadRequest`] is raised the moment a required
//! field is missing rather than deep inside a handler.
mod activity;
mod actor;
mod object;

pub use activity::*;
pub use actor::*;
pub use object::*;

use serde_json::{json, Value};

/// The sentinel addressed to mean "anyone".
pub const AP_PUBLIC: &str = "https://www.w3.org/ns/activitystreams#Public";

pub const ACTIVITY_STREAMS_NS: &str = "https://www.w3.org/ns/activitystreams";
pub const SECURITY_NS: &str = "https://w3id.org/security/v1";

/// `@context` carrying only the core AS2 namespace.
pub fn activitystreams_context() -> Value {
    json!(ACTIVITY_STREAMS_NS)
}

/// `@context` for documents that also carry a `publicKey` (actors).
pub fn security_context() -> Value {
    json!([ACTIVITY_STREAMS_NS, SECURITY_NS])
}

/// `@context` for a Person/Application actor document, including the
/// Mastodon `toot` extensions used by `discoverable`/`indexable`/`featured`.
pub fn actor_context() -> Value {
    json!([
        ACTIVITY_STREAMS_NS,
        SECURITY_NS,
        {
            "toot": "http://joinmastodon.org/ns#",
            "discoverable": "toot:discoverable",
            "indexable": "toot:indexable",
            "featured": "toot:featured",
            "manuallyApprovesFollowers": "as:manuallyApprovesFollowers",
            "PropertyValue": "schema:PropertyValue",
            "schema": "http://schema.org/#",
        }
    ])
}

/// `@context` for a Group actor document, carrying the Lemmy extensions.
pub fn group_context() -> Value {
    json!([
        ACTIVITY_STREAMS_NS,
        SECURITY_NS,
        {
            "lemmy": "https://join-lemmy.org/ns#",
            "moderators": "lemmy:moderators",
            "postingRestrictedToMods": "lemmy:postingRestrictedToMods",
            "sensitive": "as:sensitive",
            "PropertyValue": "schema:PropertyValue",
            "schema": "http://schema.org/#",
        }
    ])
}
