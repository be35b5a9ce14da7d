//! HTTP binding for `/.well-known/nodeinfo` and `/nodeinfo/{2.0,2.1}`.

use axum::extract::Extension;

use crate::{nodeinfo, routes::extractors::Jrd, state::SharedState, Result};

pub async fn discovery(Extension(state): Extension<SharedState>) -> Jrd<serde_json::Value> {
    Jrd(nodeinfo::discovery_links(&state))
}

pub async fn v2_0(Extension(state): Extension<SharedState>) -> Result<Jrd<nodeinfo::NodeInfo>> {
    Ok(Jrd(nodeinfo::nodeinfo(&state, "2.0").await?))
}

pub async fn v2_1(Extension(state): Extension<SharedState>) -> Result<Jrd<nodeinfo::NodeInfo>> {
    Ok(Jrd(nodeinfo::nodeinfo(&state, "2.1").await?))
}
