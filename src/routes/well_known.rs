//! HTTP binding for `/.well-known/webfinger` and `/.well-known/host-meta`.

use axum::{
    extract::{Extension, Query},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::{routes::extractors::Jrd, state::SharedState, well_known, Error, Result};

#[derive(Debug, Deserialize)]
pub struct WebfingerParams {
    resource: String,
}

#[tracing::instrument(level = "debug", skip(state), err)]
pub async fn webfinger(Query(params): Query<WebfingerParams>, Extension(state): Extension<SharedState>) -> Result<Jrd<well_known::WebfingerResource>> {
    well_known::webfinger(&state, &params.resource)
        .await?
        .map(Jrd)
        .ok_or_else(|| Error::NotFound(format!("no such user: {}", params.resource)))
}

pub async fn host_meta(Extension(state): Extension<SharedState>) -> Response {
    let headers = [(header::CONTENT_TYPE, "application/xrd+xml")];
    (headers, well_known::host_meta(&state)).into_response()
}
