//! Pure inbound activity processing: dispatch by activity type, mutating
//! follower graph, like/announce counts, the remote-content mirror and
//! notifications. Carries no HTTP concerns — see `routes::inbox` for the
//! handler that verifies signatures and calls into this.

use tracing::info;

use crate::{
    activities,
    followers,
    likes,
    model::{Activity, ActivityKind},
    notifications::{self, NotificationKind},
    remote_content,
    state::FederationRuntime,
    Error, Result,
};

/// Processes one verified, validated inbound activity addressed to
/// `local_handle`'s inbox. Returns the `Accept`/`Reject` to send back, if
/// this activity calls for one.
#[tracing::instrument(level = "info", skip(state, activity), fields(kind = ?activity.kind), err)]
pub async fn process(state: &FederationRuntime, local_handle: &str, activity: &Activity) -> Result<Option<Activity>> {
    activity.validate()?;
    let actor_uri = activity.actor_id().to_owned();

    match activity.kind {
        ActivityKind::Follow => handle_follow(state, local_handle, activity, &actor_uri).await,
        ActivityKind::Accept => {
            handle_accept(state, activity).await?;
            Ok(None)
        }
        ActivityKind::Reject => {
            handle_reject(state, activity).await?;
            Ok(None)
        }
        ActivityKind::Undo => {
            handle_undo(state, local_handle, activity, &actor_uri).await?;
            Ok(None)
        }
        ActivityKind::Like => {
            handle_like(state, local_handle, activity, &actor_uri).await?;
            Ok(None)
        }
        ActivityKind::Announce => {
            handle_announce(state, local_handle, activity, &actor_uri).await?;
            Ok(None)
        }
        ActivityKind::Create => {
            handle_create(state, activity, &actor_uri).await?;
            Ok(None)
        }
        ActivityKind::Update => {
            handle_update(state, activity).await?;
            Ok(None)
        }
        ActivityKind::Delete => {
            handle_delete(state, activity).await?;
            Ok(None)
        }
        // Add/Remove/Move/Block/Flag are accepted but not acted on by this core.
        _ => Ok(None),
    }
}

async fn handle_follow(
    state: &FederationRuntime,
    local_handle: &str,
    activity: &Activity,
    actor_uri: &str,
) -> Result<Option<Activity>> {
    let auto_approved = followers::record_incoming_follow(state, local_handle, actor_uri, &activity.id).await?;
    notifications::push(state, local_handle, NotificationKind::Follow, actor_uri, None).await?;

    info!(%actor_uri, auto_approved, "recorded follow request");

    if auto_approved {
        let local_actor_uri = state.config.actor_uri(local_handle);
        Ok(Some(activities::accept(&state.config, &local_actor_uri, activity, actor_uri)))
    } else {
        Ok(None)
    }
}

async fn handle_accept(state: &FederationRuntime, activity: &Activity) -> Result<()> {
    let target_id = activity
        .object
        .as_ref()
        .and_then(|o| o.id())
        .ok_or_else(|| Error::BadRequest("Accept missing object".into()))?;

    let Some(entry) = followers::resolve_outgoing_follow(state, target_id).await? else {
        return Ok(());
    };
    followers::confirm_outgoing_follow(state, &entry.handle, &entry.target_uri).await
}

async fn handle_reject(state: &FederationRuntime, activity: &Activity) -> Result<()> {
    let target_id = activity
        .object
        .as_ref()
        .and_then(|o| o.id())
        .ok_or_else(|| Error::BadRequest("Reject missing object".into()))?;

    let Some(entry) = followers::resolve_outgoing_follow(state, target_id).await? else {
        return Ok(());
    };
    followers::drop_outgoing_follow(state, &entry.handle, &entry.target_uri).await
}

async fn handle_undo(state: &FederationRuntime, local_handle: &str, activity: &Activity, actor_uri: &str) -> Result<()> {
    let object_ref = activity
        .object
        .as_ref()
        .ok_or_else(|| Error::BadRequest("Undo missing object".into()))?;

    // Most senders embed the original activity with its type; a bare id
    // with no type information is treated as undoing a follow, the most
    // common case and the one every inbox accepts unconditionally.
    match object_ref.raw_type().unwrap_or("Follow") {
        "Follow" => followers::remove_follower(state, local_handle, actor_uri).await,
        "Like" => {
            if let Some(object_id) = object_ref.raw_object_id() {
                likes::remove_like(state, object_id, actor_uri).await
            } else {
                Ok(())
            }
        }
        "Announce" => {
            if let Some(object_id) = object_ref.raw_object_id() {
                likes::remove_announce(state, object_id, actor_uri).await
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

async fn handle_like(state: &FederationRuntime, local_handle: &str, activity: &Activity, actor_uri: &str) -> Result<()> {
    let object_id = activity
        .object
        .as_ref()
        .and_then(|o| o.id())
        .ok_or_else(|| Error::BadRequest("Like missing object".into()))?;

    likes::add_like(state, &activity.id, actor_uri, object_id).await?;
    notifications::push(state, local_handle, NotificationKind::Like, actor_uri, Some(object_id)).await?;
    Ok(())
}

async fn handle_announce(state: &FederationRuntime, local_handle: &str, activity: &Activity, actor_uri: &str) -> Result<()> {
    let object_id = activity
        .object
        .as_ref()
        .and_then(|o| o.id())
        .ok_or_else(|| Error::BadRequest("Announce missing object".into()))?;

    likes::add_announce(state, &activity.id, actor_uri, object_id).await?;
    notifications::push(state, local_handle, NotificationKind::Announce, actor_uri, Some(object_id)).await?;
    Ok(())
}

async fn handle_create(state: &FederationRuntime, activity: &Activity, actor_uri: &str) -> Result<()> {
    let Some(object) = activity.object.as_ref().and_then(|o| o.embedded()) else {
        return Ok(());
    };

    remote_content::mirror(state, object.clone(), actor_uri).await?;

    if let Some(common) = object.common() {
        for recipient in common.to.iter().chain(common.cc.iter()) {
            if let Some(handle) = followers::extract_handle_from_uri(recipient) {
                notifications::push(state, &handle, NotificationKind::Mention, actor_uri, Some(object.id())).await?;
            }
        }
    }
    Ok(())
}

async fn handle_update(state: &FederationRuntime, activity: &Activity) -> Result<()> {
    let Some(object) = activity.object.as_ref().and_then(|o| o.embedded()) else {
        return Ok(());
    };
    let fetched_from = object.common().and_then(|c| c.attributed_to.clone()).unwrap_or_default();
    remote_content::mirror(state, object.clone(), &fetched_from).await
}

async fn handle_delete(state: &FederationRuntime, activity: &Activity) -> Result<()> {
    let object_id = activity
        .object
        .as_ref()
        .and_then(|o| o.id())
        .ok_or_else(|| Error::BadRequest("Delete missing object".into()))?;
    remote_content::tombstone(state, object_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, model::ObjectRef, store::InMemoryStore};
    use std::sync::Arc;

    fn test_state(auto_approve: bool) -> FederationRuntime {
        let config = Config {
            site_base_url: "https://example.com".into(),
            auto_approve_follows: auto_approve,
            ..Default::default()
        };
        FederationRuntime::new(config, Arc::new(InMemoryStore::default()))
    }

    fn follow_activity(config: &Config, target_handle: &str) -> Activity {
        activities::follow(config, "https://remote.example/@bob", &config.actor_uri(target_handle))
    }

    #[tokio::test]
    async fn auto_approved_follow_returns_an_accept() {
        let state = test_state(true);
        let activity = follow_activity(&state.config, "alice");

        let reply = process(&state, "alice", &activity).await.unwrap();
        assert!(matches!(reply, Some(ref a) if a.kind == ActivityKind::Accept));
        assert!(followers::is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());
    }

    #[tokio::test]
    async fn manual_follow_produces_no_immediate_reply() {
        let state = test_state(false);
        let activity = follow_activity(&state.config, "alice");

        let reply = process(&state, "alice", &activity).await.unwrap();
        assert!(reply.is_none());
        assert!(!followers::is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());
    }

    #[tokio::test]
    async fn undo_with_no_type_hint_unfollows() {
        let state = test_state(true);
        let follow = follow_activity(&state.config, "alice");
        process(&state, "alice", &follow).await.unwrap();
        assert!(followers::is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());

        let mut undo = activities::undo(&state.config, "https://remote.example/@bob", &follow);
        undo.object = Some(ObjectRef::Id(follow.id.clone()));

        process(&state, "alice", &undo).await.unwrap();
        assert!(!followers::is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());
    }

    #[tokio::test]
    async fn like_records_and_notifies_owner() {
        let state = test_state(true);
        let activity = activities::like(
            &state.config,
            "https://remote.example/@bob",
            "https://example.com/objects/1",
        );

        process(&state, "alice", &activity).await.unwrap();
        assert_eq!(likes::like_count(&state, "https://example.com/objects/1").await.unwrap(), 1);

        let notes = notifications::list(&state, "alice").await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].kind, NotificationKind::Like);
    }
}
