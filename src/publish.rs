//! Turns the host site's own content into outbound activities and enqueues
//! delivery to the right audience: followers plus anyone explicitly
//! mentioned, deduplicated down to one POST per remote inbox.

use std::collections::HashSet;

use chrono::Utc;

use crate::{
    activities,
    convert::{self, Content},
    followers, mentions,
    model::{Activity, TombstoneFields},
    state::FederationRuntime,
    Result,
};

fn mentioned_actor_uris(content: &Content) -> Vec<String> {
    mentions::parse_mentions(&content.body)
        .into_iter()
        .filter_map(|m| m.domain.map(|domain| format!("https://{domain}/@{}", m.handle)))
        .collect()
}

/// Followers plus mentioned actors, restricted to actors on a different
/// host than ours (our own followers/mentions never get delivered to).
async fn remote_audience(state: &FederationRuntime, author_handle: &str, mentioned: &[String]) -> Result<Vec<String>> {
    let mut audience: Vec<String> = followers::follower_uris(state, author_handle).await?;
    audience.extend(mentioned.iter().cloned());
    audience.retain(|uri| !state.config.is_local_uri(uri));

    let mut seen = HashSet::new();
    audience.retain(|uri| seen.insert(uri.clone()));
    Ok(audience)
}

/// Resolves each actor in `audience` to an inbox (preferring `sharedInbox`),
/// deduplicated so an instance with many recipients only gets one delivery.
async fn resolve_inboxes(state: &FederationRuntime, audience: &[String]) -> Vec<String> {
    let mut inboxes = HashSet::new();

    for actor_uri in audience {
        match state.fetch_actor(actor_uri).await {
            Ok(actor) => {
                inboxes.insert(crate::delivery::resolve_inbox(&actor).to_owned());
            }
            Err(e) => {
                tracing::warn!(%actor_uri, error = %e, "could not resolve inbox, skipping recipient");
            }
        }
    }

    inboxes.into_iter().collect()
}

async fn deliver(state: &FederationRuntime, author_handle: &str, activity: &Activity, mentioned: &[String]) -> Result<usize> {
    let audience = remote_audience(state, author_handle, mentioned).await?;
    let inboxes = resolve_inboxes(state, &audience).await;
    crate::delivery::enqueue(state, author_handle, activity, inboxes).await
}

pub async fn publish_create(state: &FederationRuntime, content: &Content) -> Result<Activity> {
    let mentioned = mentioned_actor_uris(content);
    let object = convert::to_object(&state.config, content, &mentioned);
    let (to, cc) = convert::addressing(&state.config, content, &mentioned);
    let actor_uri = state.config.actor_uri(&content.author_handle);

    let activity = activities::create(&state.config, &actor_uri, object, to, cc);
    if convert::should_federate(content) {
        deliver(state, &content.author_handle, &activity, &mentioned).await?;
    }
    Ok(activity)
}

pub async fn publish_update(state: &FederationRuntime, content: &Content) -> Result<Activity> {
    let mentioned = mentioned_actor_uris(content);
    let object = convert::to_object(&state.config, content, &mentioned);
    let (to, cc) = convert::addressing(&state.config, content, &mentioned);
    let actor_uri = state.config.actor_uri(&content.author_handle);

    let activity = activities::update(&state.config, &actor_uri, object, to, cc);
    if convert::should_federate(content) {
        deliver(state, &content.author_handle, &activity, &mentioned).await?;
    }
    Ok(activity)
}

pub async fn publish_delete(state: &FederationRuntime, content: &Content) -> Result<Activity> {
    let mentioned = mentioned_actor_uris(content);
    let (to, cc) = convert::addressing(&state.config, content, &mentioned);
    let actor_uri = state.config.actor_uri(&content.author_handle);

    let tombstone = crate::model::Object::Tombstone(TombstoneFields {
        id: convert::object_id(&state.config, content),
        former_type: content_type_name(content),
        deleted: Utc::now(),
    });

    let activity = activities::delete(&state.config, &actor_uri, tombstone, to, cc);
    if convert::should_federate(content) {
        deliver(state, &content.author_handle, &activity, &mentioned).await?;
    }

    crate::remote_content::tombstone(state, &convert::object_id(&state.config, content)).await?;
    Ok(activity)
}

fn content_type_name(content: &Content) -> String {
    use crate::convert::ContentKind::*;
    match content.kind {
        Note => "Note",
        Article => "Article",
        Page => "Page",
        Image => "Image",
        Audio => "Audio",
        Document => "Document",
        Video => "Video",
        Event => "Event",
    }
    .to_owned()
}
