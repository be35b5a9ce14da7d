//! Follower/following graph state: who follows us, who we follow, and the
//! accept/reject lifecycle for pending requests.

use serde::{Deserialize, Serialize};

use crate::{state::FederationRuntime, Result};

const FOLLOWERS_NS: &str = "followers";
const FOLLOWING_NS: &str = "following";
const FOLLOW_INDEX_NS: &str = "follow_index";

/// Correlates an outgoing `Follow` activity id back to who sent it and who
/// it targets, so a later `Accept`/`Reject` (which only references the
/// activity id) can find its way back to the right follower record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowIndexEntry {
    pub handle: String,
    pub target_uri: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRecord {
    pub actor_uri: String,
    pub activity_id: String,
    pub status: FollowStatus,
}

async fn load(state: &FederationRuntime, namespace: &str, handle: &str) -> Result<Vec<FollowRecord>> {
    Ok(state.store.get(namespace, handle).await?.unwrap_or_default())
}

async fn save(state: &FederationRuntime, namespace: &str, handle: &str, records: &[FollowRecord]) -> Result<()> {
    state.store.put(namespace, handle, &records.to_vec()).await
}

/// Records an inbound follow request from `actor_uri`, upserting by actor
/// URI so a duplicate `Follow` doesn't create a second pending entry.
/// Returns whether the request was auto-accepted.
pub async fn record_incoming_follow(
    state: &FederationRuntime,
    handle: &str,
    actor_uri: &str,
    activity_id: &str,
) -> Result<bool> {
    let lock = state.lock_for(FOLLOWERS_NS, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, FOLLOWERS_NS, handle).await?;
    let auto_approve = state.config.auto_approve_follows;
    let status = if auto_approve { FollowStatus::Accepted } else { FollowStatus::Pending };

    match records.iter_mut().find(|r| r.actor_uri == actor_uri) {
        Some(existing) => {
            existing.activity_id = activity_id.to_owned();
            existing.status = status;
        }
        None => records.push(FollowRecord {
            actor_uri: actor_uri.to_owned(),
            activity_id: activity_id.to_owned(),
            status,
        }),
    }

    save(state, FOLLOWERS_NS, handle, &records).await?;
    Ok(auto_approve)
}

pub async fn accept_follow_request(state: &FederationRuntime, handle: &str, actor_uri: &str) -> Result<()> {
    let lock = state.lock_for(FOLLOWERS_NS, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, FOLLOWERS_NS, handle).await?;
    for r in records.iter_mut().filter(|r| r.actor_uri == actor_uri) {
        r.status = FollowStatus::Accepted;
    }
    save(state, FOLLOWERS_NS, handle, &records).await
}

pub async fn reject_follow_request(state: &FederationRuntime, handle: &str, actor_uri: &str) -> Result<()> {
    let lock = state.lock_for(FOLLOWERS_NS, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, FOLLOWERS_NS, handle).await?;
    records.retain(|r| r.actor_uri != actor_uri);
    save(state, FOLLOWERS_NS, handle, &records).await
}

pub async fn remove_follower(state: &FederationRuntime, handle: &str, actor_uri: &str) -> Result<()> {
    reject_follow_request(state, handle, actor_uri).await
}

pub async fn follower_uris(state: &FederationRuntime, handle: &str) -> Result<Vec<String>> {
    Ok(load(state, FOLLOWERS_NS, handle)
        .await?
        .into_iter()
        .filter(|r| r.status == FollowStatus::Accepted)
        .map(|r| r.actor_uri)
        .collect())
}

pub async fn is_follower(state: &FederationRuntime, handle: &str, actor_uri: &str) -> Result<bool> {
    Ok(load(state, FOLLOWERS_NS, handle)
        .await?
        .iter()
        .any(|r| r.actor_uri == actor_uri && r.status == FollowStatus::Accepted))
}

/// Records that `handle` has sent a `Follow` to `target_uri`, pending
/// remote `Accept`/`Reject`.
pub async fn record_outgoing_follow(
    state: &FederationRuntime,
    handle: &str,
    target_uri: &str,
    activity_id: &str,
) -> Result<()> {
    let lock = state.lock_for(FOLLOWING_NS, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, FOLLOWING_NS, handle).await?;
    match records.iter_mut().find(|r| r.actor_uri == target_uri) {
        Some(existing) => existing.activity_id = activity_id.to_owned(),
        None => records.push(FollowRecord {
            actor_uri: target_uri.to_owned(),
            activity_id: activity_id.to_owned(),
            status: FollowStatus::Pending,
        }),
    }
    save(state, FOLLOWING_NS, handle, &records).await?;

    state
        .store
        .put(
            FOLLOW_INDEX_NS,
            activity_id,
            &FollowIndexEntry { handle: handle.to_owned(), target_uri: target_uri.to_owned() },
        )
        .await
}

/// Looks up who sent a previously-issued `Follow` activity and who it
/// targeted, given the activity's id.
pub async fn resolve_outgoing_follow(state: &FederationRuntime, activity_id: &str) -> Result<Option<FollowIndexEntry>> {
    state.store.get(FOLLOW_INDEX_NS, activity_id).await
}

pub async fn confirm_outgoing_follow(state: &FederationRuntime, handle: &str, target_uri: &str) -> Result<()> {
    accept_follow_request_in(state, FOLLOWING_NS, handle, target_uri).await
}

async fn accept_follow_request_in(
    state: &FederationRuntime,
    namespace: &str,
    handle: &str,
    actor_uri: &str,
) -> Result<()> {
    let lock = state.lock_for(namespace, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, namespace, handle).await?;
    for r in records.iter_mut().filter(|r| r.actor_uri == actor_uri) {
        r.status = FollowStatus::Accepted;
    }
    save(state, namespace, handle, &records).await
}

pub async fn drop_outgoing_follow(state: &FederationRuntime, handle: &str, target_uri: &str) -> Result<()> {
    let lock = state.lock_for(FOLLOWING_NS, handle).await;
    let _guard = lock.lock().await;

    let mut records = load(state, FOLLOWING_NS, handle).await?;
    records.retain(|r| r.actor_uri != target_uri);
    save(state, FOLLOWING_NS, handle, &records).await
}

pub async fn is_following(state: &FederationRuntime, handle: &str, target_uri: &str) -> Result<bool> {
    Ok(load(state, FOLLOWING_NS, handle)
        .await?
        .iter()
        .any(|r| r.actor_uri == target_uri && r.status == FollowStatus::Accepted))
}

pub async fn following_uris(state: &FederationRuntime, handle: &str) -> Result<Vec<String>> {
    Ok(load(state, FOLLOWING_NS, handle)
        .await?
        .into_iter()
        .filter(|r| r.status == FollowStatus::Accepted)
        .map(|r| r.actor_uri)
        .collect())
}

/// Pulls the local-style handle segment out of an actor URI, e.g.
/// `https://example.com/@alice` -> `Some("alice")`. Returns `None` for
/// URIs that don't end in a `@handle` path segment (groups, bare ids).
pub fn extract_handle_from_uri(uri: &str) -> Option<String> {
    uri.rsplit('/').next().and_then(|seg| seg.strip_prefix('@')).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, store::InMemoryStore};
    use std::sync::Arc;

    fn test_state(auto_approve: bool) -> FederationRuntime {
        let config = Config {
            site_base_url: "https://example.com".into(),
            auto_approve_follows: auto_approve,
            ..Default::default()
        };
        FederationRuntime::new(config, Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn auto_approve_accepts_immediately() {
        let state = test_state(true);
        let accepted = record_incoming_follow(&state, "alice", "https://remote.example/@bob", "act1")
            .await
            .unwrap();
        assert!(accepted);
        assert!(is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());
    }

    #[tokio::test]
    async fn manual_approve_requires_accept() {
        let state = test_state(false);
        let accepted = record_incoming_follow(&state, "alice", "https://remote.example/@bob", "act1")
            .await
            .unwrap();
        assert!(!accepted);
        assert!(!is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());

        accept_follow_request(&state, "alice", "https://remote.example/@bob").await.unwrap();
        assert!(is_follower(&state, "alice", "https://remote.example/@bob").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_follow_does_not_duplicate_record() {
        let state = test_state(true);
        record_incoming_follow(&state, "alice", "https://remote.example/@bob", "act1").await.unwrap();
        record_incoming_follow(&state, "alice", "https://remote.example/@bob", "act2").await.unwrap();
        assert_eq!(follower_uris(&state, "alice").await.unwrap().len(), 1);
    }

    #[test]
    fn extracts_handle_from_actor_uri() {
        assert_eq!(
            extract_handle_from_uri("https://example.com/@alice"),
            Some("alice".to_owned())
        );
        assert_eq!(extract_handle_from_uri("https://example.com/c/group"), None);
    }
}
