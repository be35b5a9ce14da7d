//! Per-local-actor notification feed. Capped at a fixed size; once full,
//! the oldest entry is dropped to make room rather than growing forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{state::FederationRuntime, Result};

const NAMESPACE: &str = "notifications";
const MAX_NOTIFICATIONS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Follow,
    Like,
    Announce,
    Mention,
    Reply,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub actor_uri: String,
    pub object_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn push(
    state: &FederationRuntime,
    handle: &str,
    kind: NotificationKind,
    actor_uri: &str,
    object_id: Option<&str>,
) -> Result<()> {
    let lock = state.lock_for(NAMESPACE, handle).await;
    let _guard = lock.lock().await;

    let mut notifications: Vec<Notification> = state.store.get(NAMESPACE, handle).await?.unwrap_or_default();

    notifications.insert(
        0,
        Notification {
            id: Uuid::new_v4().to_string(),
            kind,
            actor_uri: actor_uri.to_owned(),
            object_id: object_id.map(str::to_owned),
            created_at: Utc::now(),
        },
    );
    notifications.truncate(MAX_NOTIFICATIONS);

    state.store.put(NAMESPACE, handle, &notifications).await
}

pub async fn list(state: &FederationRuntime, handle: &str) -> Result<Vec<Notification>> {
    Ok(state.store.get(NAMESPACE, handle).await?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, store::InMemoryStore};
    use std::sync::Arc;

    fn test_state() -> FederationRuntime {
        FederationRuntime::new(Config::default(), Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn push_prepends_newest_first() {
        let state = test_state();
        push(&state, "alice", NotificationKind::Follow, "https://remote/@bob", None)
            .await
            .unwrap();
        push(&state, "alice", NotificationKind::Like, "https://remote/@carol", Some("obj1"))
            .await
            .unwrap();

        let notifications = list(&state, "alice").await.unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].actor_uri, "https://remote/@carol");
    }

    #[tokio::test]
    async fn list_is_capped_at_100() {
        let state = test_state();
        for i in 0..150 {
            push(
                &state,
                "alice",
                NotificationKind::Like,
                &format!("https://remote/@user{i}"),
                None,
            )
            .await
            .unwrap();
        }
        assert_eq!(list(&state, "alice").await.unwrap().len(), MAX_NOTIFICATIONS);
    }
}
