//! A local mirror of remote objects we've been shown (via `Create`,
//! `Announce`, or as the target of a reply), so we can render them without
//! refetching. `Delete` activities tombstone the entry rather than removing
//! it outright, matching how the object itself behaves on its origin server.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    model::{Object, TombstoneFields},
    state::FederationRuntime,
    Result,
};

const NAMESPACE: &str = "remote_content";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirroredObject {
    pub object: Object,
    pub fetched_from: String,
}

fn key_for(object_id: &str) -> String {
    urlencoding::encode(object_id).into_owned()
}

pub async fn mirror(state: &FederationRuntime, object: Object, fetched_from: &str) -> Result<()> {
    let key = key_for(object.id());
    state
        .store
        .put(
            NAMESPACE,
            &key,
            &MirroredObject {
                object,
                fetched_from: fetched_from.to_owned(),
            },
        )
        .await
}

pub async fn get(state: &FederationRuntime, object_id: &str) -> Result<Option<MirroredObject>> {
    state.store.get(NAMESPACE, &key_for(object_id)).await
}

/// Replaces the mirrored object with a `Tombstone`, leaving the record
/// (and its id) addressable but content-free.
pub async fn tombstone(state: &FederationRuntime, object_id: &str) -> Result<()> {
    let key = key_for(object_id);
    let Some(mut mirrored) = get(state, object_id).await? else {
        return Ok(());
    };

    let former_type = mirrored.object.type_name().to_owned();
    mirrored.object = Object::Tombstone(TombstoneFields {
        id: object_id.to_owned(),
        former_type,
        deleted: Utc::now(),
    });

    state.store.put(NAMESPACE, &key, &mirrored).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, model::ObjectCommon, store::InMemoryStore};
    use std::sync::Arc;

    fn test_state() -> FederationRuntime {
        FederationRuntime::new(Config::default(), Arc::new(InMemoryStore::default()))
    }

    fn note(id: &str) -> Object {
        Object::Note(ObjectCommon {
            id: id.to_owned(),
            content: Some("hello".into()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn mirror_and_fetch_round_trips() {
        let state = test_state();
        let id = "https://remote.example/posts/1";
        mirror(&state, note(id), "https://remote.example").await.unwrap();

        let mirrored = get(&state, id).await.unwrap().unwrap();
        assert_eq!(mirrored.object.id(), id);
    }

    #[tokio::test]
    async fn delete_tombstones_instead_of_removing() {
        let state = test_state();
        let id = "https://remote.example/posts/1";
        mirror(&state, note(id), "https://remote.example").await.unwrap();
        tombstone(&state, id).await.unwrap();

        let mirrored = get(&state, id).await.unwrap().unwrap();
        assert!(matches!(mirrored.object, Object::Tombstone(_)));
        assert_eq!(mirrored.object.id(), id);
    }

    #[tokio::test]
    async fn tombstoning_an_unknown_object_is_a_no_op() {
        let state = test_state();
        tombstone(&state, "https://remote.example/posts/missing").await.unwrap();
        assert!(get(&state, "https://remote.example/posts/missing").await.unwrap().is_none());
    }
}
