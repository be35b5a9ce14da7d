//! Routes available on this server: actor documents, their collections,
//! the inbox (per-actor and shared), and discovery (WebFinger/NodeInfo).

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::state::FederationRuntime;

pub mod actor;
pub mod collections;
pub mod extractors;
pub mod inbox;
pub mod nodeinfo;
pub mod well_known;

pub fn build_routes(state: Arc<FederationRuntime>) -> Router {
    Router::new()
        .route("/@:handle", get(actor::get_actor))
        .route("/@:handle/:collection", get(collections::get_collection))
        .route("/@:handle/inbox", post(inbox::post_actor_inbox))
        .route("/inbox", post(inbox::post_shared_inbox))
        .route("/.well-known/webfinger", get(well_known::webfinger))
        .route("/.well-known/host-meta", get(well_known::host_meta))
        .route("/.well-known/nodeinfo", get(nodeinfo::discovery))
        .route("/nodeinfo/2.0", get(nodeinfo::v2_0))
        .route("/nodeinfo/2.1", get(nodeinfo::v2_1))
        .layer(Extension(state))
}
