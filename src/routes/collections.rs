//! `GET /@{handle}/{inbox|outbox|followers|following|liked|featured}`: the
//! OrderedCollection endpoints. Followers/following are backed by this
//! core's own store; the rest are owned by the host application, which
//! this core has no visibility into, so they're served as empty
//! collections rather than guessed at.

use axum::extract::{Extension, Path};
use serde_json::{json, Value};

use crate::{followers, model::activitystreams_context, routes::extractors::Activity, state::SharedState, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Inbox,
    Outbox,
    Followers,
    Following,
    Liked,
    Featured,
}

impl CollectionKind {
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "inbox" => Some(Self::Inbox),
            "outbox" => Some(Self::Outbox),
            "followers" => Some(Self::Followers),
            "following" => Some(Self::Following),
            "liked" => Some(Self::Liked),
            "featured" => Some(Self::Featured),
            _ => None,
        }
    }
}

fn ordered_collection(id: &str, items: Vec<String>) -> Value {
    json!({
        "@context": activitystreams_context(),
        "id": id,
        "type": "OrderedCollection",
        "totalItems": items.len(),
        "orderedItems": items,
    })
}

#[tracing::instrument(level = "debug", skip(state), err)]
pub async fn get_collection(Path((handle, collection)): Path<(String, String)>, Extension(state): Extension<SharedState>) -> Result<Activity<Value>> {
    let kind = CollectionKind::parse(&collection)
        .ok_or_else(|| Error::NotFound(format!("no such collection: {collection}")))?;

    let id = format!("{}/@{handle}/{collection}", state.config.site_base_url);

    let items = match kind {
        CollectionKind::Followers => followers::follower_uris(&state, &handle).await?,
        CollectionKind::Following => followers::following_uris(&state, &handle).await?,
        // Inbox processing doesn't retain a durable list; outbox, liked and
        // featured content belong to the host application's own content
        // store, which this core doesn't read from.
        CollectionKind::Inbox | CollectionKind::Outbox | CollectionKind::Liked | CollectionKind::Featured => vec![],
    };

    Ok(Activity(ordered_collection(&id, items)))
}
