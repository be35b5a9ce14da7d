//! Like/Announce bookkeeping, keyed by the object being liked or boosted so
//! counts and `Undo` handling don't need to scan activity history.

use serde::{Deserialize, Serialize};

use crate::{state::FederationRuntime, Result};

const LIKES_NS: &str = "likes";
const ANNOUNCES_NS: &str = "announces";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LikeRecord {
    pub activity_id: String,
    pub actor_uri: String,
    pub object_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnounceRecord {
    pub activity_id: String,
    pub actor_uri: String,
    pub object_id: String,
}

fn object_key(object_id: &str) -> String {
    urlencoding::encode(object_id).into_owned()
}

async fn add<T: Serialize + for<'de> Deserialize<'de> + Clone>(
    state: &FederationRuntime,
    namespace: &str,
    object_id: &str,
    record: T,
    already_has: impl Fn(&T) -> bool,
) -> Result<()> {
    let key = object_key(object_id);
    let lock = state.lock_for(namespace, &key).await;
    let _guard = lock.lock().await;

    let mut records: Vec<T> = state.store.get(namespace, &key).await?.unwrap_or_default();
    if !records.iter().any(|r| already_has(r)) {
        records.push(record);
    }
    state.store.put(namespace, &key, &records).await
}

async fn remove_by_actor<T: Serialize + for<'de> Deserialize<'de> + Clone>(
    state: &FederationRuntime,
    namespace: &str,
    object_id: &str,
    actor_uri: &str,
    actor_of: impl Fn(&T) -> &str,
) -> Result<()> {
    let key = object_key(object_id);
    let lock = state.lock_for(namespace, &key).await;
    let _guard = lock.lock().await;

    let mut records: Vec<T> = state.store.get(namespace, &key).await?.unwrap_or_default();
    records.retain(|r| actor_of(r) != actor_uri);
    state.store.put(namespace, &key, &records).await
}

pub async fn add_like(state: &FederationRuntime, activity_id: &str, actor_uri: &str, object_id: &str) -> Result<()> {
    add(
        state,
        LIKES_NS,
        object_id,
        LikeRecord {
            activity_id: activity_id.to_owned(),
            actor_uri: actor_uri.to_owned(),
            object_id: object_id.to_owned(),
        },
        |r: &LikeRecord| r.actor_uri == actor_uri,
    )
    .await
}

pub async fn remove_like(state: &FederationRuntime, object_id: &str, actor_uri: &str) -> Result<()> {
    remove_by_actor(state, LIKES_NS, object_id, actor_uri, |r: &LikeRecord| &r.actor_uri).await
}

pub async fn like_count(state: &FederationRuntime, object_id: &str) -> Result<usize> {
    let records: Vec<LikeRecord> = state.store.get(LIKES_NS, &object_key(object_id)).await?.unwrap_or_default();
    Ok(records.len())
}

pub async fn add_announce(
    state: &FederationRuntime,
    activity_id: &str,
    actor_uri: &str,
    object_id: &str,
) -> Result<()> {
    add(
        state,
        ANNOUNCES_NS,
        object_id,
        AnnounceRecord {
            activity_id: activity_id.to_owned(),
            actor_uri: actor_uri.to_owned(),
            object_id: object_id.to_owned(),
        },
        |r: &AnnounceRecord| r.actor_uri == actor_uri,
    )
    .await
}

pub async fn remove_announce(state: &FederationRuntime, object_id: &str, actor_uri: &str) -> Result<()> {
    remove_by_actor(state, ANNOUNCES_NS, object_id, actor_uri, |r: &AnnounceRecord| &r.actor_uri).await
}

pub async fn announce_count(state: &FederationRuntime, object_id: &str) -> Result<usize> {
    let records: Vec<AnnounceRecord> = state
        .store
        .get(ANNOUNCES_NS, &object_key(object_id))
        .await?
        .unwrap_or_default();
    Ok(records.len())
}
