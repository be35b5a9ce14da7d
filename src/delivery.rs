//! Outbound delivery: a durable per-sender queue with exponential backoff,
//! signed with the sending actor's own key.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    actors::StoredActor,
    config::Config,
    model::{Activity, Actor},
    signature,
    state::FederationRuntime,
    Error, Result,
};

const NAMESPACE: &str = "delivery_queue";
const MAX_BACKOFF_MS: i64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTask {
    pub id: String,
    pub sender_handle: String,
    pub recipient_inbox: String,
    pub activity: Activity,
    pub retry_count: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct DeliveryStats {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub dropped: u32,
}

fn backoff_for(retry_count: u32) -> Duration {
    let ms = 1000i64.saturating_mul(1i64 << retry_count.min(20)).min(MAX_BACKOFF_MS);
    Duration::from_millis(ms as u64)
}

/// `sharedInbox` if the actor advertises one, otherwise its own inbox.
pub fn resolve_inbox(actor: &Actor) -> &str {
    actor
        .endpoints
        .as_ref()
        .and_then(|e| e.shared_inbox.as_deref())
        .unwrap_or(&actor.inbox)
}

async fn load_queue(state: &FederationRuntime, sender_handle: &str) -> Result<Vec<DeliveryTask>> {
    Ok(state.store.get(NAMESPACE, sender_handle).await?.unwrap_or_default())
}

async fn save_queue(state: &FederationRuntime, sender_handle: &str, queue: &[DeliveryTask]) -> Result<()> {
    state.store.put(NAMESPACE, sender_handle, &queue.to_vec()).await
}

/// Enqueues one task per recipient inbox. Distinct recipients that share an
/// inbox (grouped upstream by the caller) still only get one POST each.
pub async fn enqueue(
    state: &FederationRuntime,
    sender_handle: &str,
    activity: &Activity,
    recipient_inboxes: Vec<String>,
) -> Result<usize> {
    let lock = state.lock_for(NAMESPACE, sender_handle).await;
    let _guard = lock.lock().await;

    let mut queue = load_queue(state, sender_handle).await?;
    let now = Utc::now();
    let count = recipient_inboxes.len();

    for inbox in recipient_inboxes {
        queue.push(DeliveryTask {
            id: Uuid::new_v4().to_string(),
            sender_handle: sender_handle.to_owned(),
            recipient_inbox: inbox,
            activity: activity.clone(),
            retry_count: 0,
            next_attempt_at: now,
            last_error: None,
        });
    }

    save_queue(state, sender_handle, &queue).await?;
    Ok(count)
}

/// Every task across every sender whose `next_attempt_at` has passed.
pub async fn due_tasks(state: &FederationRuntime) -> Result<Vec<DeliveryTask>> {
    let now = Utc::now();
    let mut due = vec![];

    for sender_handle in state.store.list(NAMESPACE).await? {
        let queue = load_queue(state, &sender_handle).await?;
        due.extend(queue.into_iter().filter(|t| t.next_attempt_at <= now));
    }

    Ok(due)
}

async fn remove_task(state: &FederationRuntime, task: &DeliveryTask) -> Result<()> {
    let lock = state.lock_for(NAMESPACE, &task.sender_handle).await;
    let _guard = lock.lock().await;

    let mut queue = load_queue(state, &task.sender_handle).await?;
    queue.retain(|t| t.id != task.id);
    save_queue(state, &task.sender_handle, &queue).await
}

async fn reschedule_task(state: &FederationRuntime, mut task: DeliveryTask, error: String) -> Result<bool> {
    task.retry_count += 1;
    task.last_error = Some(error);

    let dropped = task.retry_count > state.config.max_delivery_retries;

    let lock = state.lock_for(NAMESPACE, &task.sender_handle).await;
    let _guard = lock.lock().await;
    let mut queue = load_queue(state, &task.sender_handle).await?;
    queue.retain(|t| t.id != task.id);

    if !dropped {
        task.next_attempt_at = Utc::now()
            + chrono::Duration::from_std(backoff_for(task.retry_count)).unwrap_or_else(|_| chrono::Duration::seconds(1));
        queue.push(task);
    }

    save_queue(state, &task.sender_handle, &queue).await?;
    Ok(dropped)
}

/// Signs and POSTs a single task's activity to its recipient inbox.
pub async fn deliver_one(state: &FederationRuntime, task: &DeliveryTask, sender: &StoredActor) -> Result<()> {
    let body = serde_json::to_vec(&task.activity)?;
    let url: url::Url = task
        .recipient_inbox
        .parse()
        .map_err(|_| Error::InvalidUri { uri: task.recipient_inbox.clone() })?;
    let host = url.host_str().ok_or_else(|| Error::InvalidUri { uri: task.recipient_inbox.clone() })?;

    let key_id = format!("{}#main-key", state.config.actor_uri(&sender.handle));
    let signing_key = sender.signing_key()?;
    let headers = signature::sign_request(
        "post",
        url.path(),
        host,
        Some(&body),
        &key_id,
        &signing_key,
    )?;

    let response = state
        .http
        .post(task.recipient_inbox.clone())
        .header("content-type", "application/activity+json")
        .headers(headers)
        .body(body)
        .timeout(Duration::from_millis(state.config.federation_timeout))
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Delivery(format!(
            "{} responded {}",
            task.recipient_inbox,
            response.status()
        )));
    }

    Ok(())
}

/// Drains every due task once, delivering each and rescheduling failures
/// with exponential backoff. Intended to be called on a timer.
pub async fn run_once(state: &FederationRuntime) -> Result<DeliveryStats> {
    let mut stats = DeliveryStats::default();

    for task in due_tasks(state).await? {
        stats.attempted += 1;

        let Ok(sender) = crate::actors::get(state, &task.sender_handle).await else {
            remove_task(state, &task).await?;
            stats.dropped += 1;
            continue;
        };

        match deliver_one(state, &task, &sender).await {
            Ok(()) => {
                remove_task(state, &task).await?;
                stats.succeeded += 1;
                info!(inbox = %task.recipient_inbox, "delivery succeeded");
            }
            Err(e) => {
                stats.failed += 1;
                let dropped = reschedule_task(state, task.clone(), e.to_string()).await?;
                if dropped {
                    stats.dropped += 1;
                    warn!(inbox = %task.recipient_inbox, retries = task.retry_count, "delivery exhausted retries, dropping");
                } else {
                    warn!(inbox = %task.recipient_inbox, retries = task.retry_count, error = %e, "delivery failed, rescheduled");
                }
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::ActivityKind, store::InMemoryStore};
    use std::sync::Arc;

    fn test_state() -> FederationRuntime {
        let config = Config {
            site_base_url: "https://example.com".into(),
            max_delivery_retries: 2,
            ..Default::default()
        };
        FederationRuntime::new(config, Arc::new(InMemoryStore::default()))
    }

    fn test_activity() -> Activity {
        crate::activities::follow(
            &Config { site_base_url: "https://example.com".into(), ..Default::default() },
            "https://example.com/@alice",
            "https://remote.example/@bob",
        )
    }

    #[test]
    fn backoff_doubles_and_caps_at_five_minutes() {
        assert_eq!(backoff_for(0), Duration::from_millis(1000));
        assert_eq!(backoff_for(1), Duration::from_millis(2000));
        assert_eq!(backoff_for(2), Duration::from_millis(4000));
        assert_eq!(backoff_for(20), Duration::from_millis(MAX_BACKOFF_MS as u64));
    }

    #[tokio::test]
    async fn enqueue_creates_one_task_per_inbox() {
        let state = test_state();
        let activity = test_activity();
        let count = enqueue(
            &state,
            "alice",
            &activity,
            vec!["https://remote.example/inbox".into(), "https://remote2.example/inbox".into()],
        )
        .await
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(due_tasks(&state).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reschedule_drops_after_max_retries() {
        let state = test_state();
        let activity = test_activity();
        enqueue(&state, "alice", &activity, vec!["https://remote.example/inbox".into()]).await.unwrap();
        let mut task = due_tasks(&state).await.unwrap().remove(0);

        // retry_count: 0 -> 1 -> 2 -> 3 (max_delivery_retries = 2, so the third failure drops it)
        task.retry_count = 0;
        reschedule_task(&state, task.clone(), "boom".into()).await.unwrap();
        task.retry_count = 1;
        reschedule_task(&state, task.clone(), "boom".into()).await.unwrap();
        task.retry_count = 2;
        let dropped = reschedule_task(&state, task, "boom".into()).await.unwrap();
        assert!(dropped);
    }
}
