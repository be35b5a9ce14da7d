//! `GET /@{handle}`: the actor document, content-negotiated between the
//! ActivityPub JSON-LD form and the host application's own HTML profile.

use axum::{
    extract::{Extension, Path},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::{actors, routes::extractors::Activity, state::SharedState, Error, Result};

fn wants_activity_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("application/activity+json") || accept.contains("application/ld+json"))
        .unwrap_or(false)
}

/// Not our concern to render: the host application owns the HTML profile
/// page and is expected to mount its own handler ahead of this one for
/// `Accept: text/html` requests. This handler only ever serves JSON-LD.
#[tracing::instrument(level = "debug", skip(state), err)]
pub async fn get_actor(Path(handle): Path<String>, headers: HeaderMap, Extension(state): Extension<SharedState>) -> Result<Response> {
    if !wants_activity_json(&headers) {
        return Ok(StatusCode::NOT_ACCEPTABLE.into_response());
    }

    if !(state.resolve_user)(&handle) {
        return Err(Error::NotFound(format!("actor {handle}")));
    }

    let stored = actors::get(&state, &handle).await?;
    let document = stored.to_public_document(&state.config);
    Ok(Activity(document).into_response())
}
