//! HTTP binding for inbound delivery: verifies the `Digest`/`Signature`
//! headers, deserializes the envelope, hands it to the pure processor in
//! `crate::inbox`, and enqueues any `Accept`/`Reject` reply it produces.

use axum::{
    body::Bytes,
    extract::{Extension, OriginalUri, Path},
    http::{HeaderMap, StatusCode},
};
use tracing::info;

use crate::{
    delivery, inbox, model::Activity as ApActivity, signature, state::SharedState, Error, Result,
};

fn verify_body(headers: &HeaderMap, body: &[u8]) -> Result<()> {
    let Some(digest) = headers.get("digest").and_then(|v| v.to_str().ok()) else {
        return Ok(());
    };
    if !signature::verify_digest(body, digest) {
        return Err(Error::SignatureVerification("digest does not match body".into()));
    }
    Ok(())
}

async fn verify_and_parse(state: &SharedState, headers: &HeaderMap, uri_path: &str, body: Bytes) -> Result<ApActivity> {
    verify_body(headers, &body)?;

    let activity: ApActivity =
        serde_json::from_slice(&body).map_err(|e| Error::BadRequest(format!("malformed activity: {e}")))?;
    activity.validate()?;

    if state.config.signature_verification_enabled {
        signature::verify_request("POST", uri_path, headers, &state.key_cache, |uri| state.fetch_actor(uri)).await?;
    }

    Ok(activity)
}

/// Delivers the `Accept`/`Reject` reply a `Follow` produced back to its sender.
async fn enqueue_reply(state: &SharedState, sender_handle: &str, reply: &ApActivity, recipient_actor_uri: &str) -> Result<()> {
    let actor = state.fetch_actor(recipient_actor_uri).await?;
    let inbox = delivery::resolve_inbox(&actor).to_owned();
    delivery::enqueue(state, sender_handle, reply, vec![inbox]).await?;
    Ok(())
}

#[tracing::instrument(level = "info", skip(state, headers, body), err)]
pub async fn post_actor_inbox(
    Path(handle): Path<String>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Extension(state): Extension<SharedState>,
    body: Bytes,
) -> Result<StatusCode> {
    let activity = verify_and_parse(&state, &headers, uri.path(), body).await?;
    let actor_uri = activity.actor_id().to_owned();

    let reply = inbox::process(&state, &handle, &activity).await?;
    if let Some(reply) = reply {
        enqueue_reply(&state, &handle, &reply, &actor_uri).await?;
    }

    Ok(StatusCode::ACCEPTED)
}

/// `POST /inbox`: the shared inbox. The activity may be addressed to more
/// than one local actor; we dispatch it once per addressed local handle.
#[tracing::instrument(level = "info", skip(state, headers, body), err)]
pub async fn post_shared_inbox(
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    Extension(state): Extension<SharedState>,
    body: Bytes,
) -> Result<StatusCode> {
    let activity = verify_and_parse(&state, &headers, uri.path(), body).await?;
    let actor_uri = activity.actor_id().to_owned();

    let recipients: Vec<String> = activity
        .to
        .iter()
        .chain(activity.cc.iter())
        .filter_map(|uri| crate::followers::extract_handle_from_uri(uri))
        .collect();

    if recipients.is_empty() {
        info!(%actor_uri, "shared inbox delivery addressed to no known local actor");
    }

    for handle in recipients {
        if let Some(reply) = inbox::process(&state, &handle, &activity).await? {
            enqueue_reply(&state, &handle, &reply, &actor_uri).await?;
        }
    }

    Ok(StatusCode::ACCEPTED)
}
