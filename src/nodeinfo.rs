//! NodeInfo discovery (http://nodeinfo.diaspora.software/ns/schema/2.0#):
//! advertises which protocols and content types this instance federates,
//! and rough usage counts. Reached via `/.well-known/nodeinfo`, which
//! points at `/nodeinfo/2.0` and `/nodeinfo/2.1`.

use serde::{Deserialize, Serialize};

use crate::{state::FederationRuntime, Result};

pub const SCHEMA_2_0: &str = "http://nodeinfo.diaspora.software/ns/schema/2.0";
pub const SCHEMA_2_1: &str = "http://nodeinfo.diaspora.software/ns/schema/2.1";

const ACTORS_NAMESPACE: &str = "actors";

/// The `/.well-known/nodeinfo` document: a pointer to the versioned descriptor.
pub fn discovery_links(state: &FederationRuntime) -> serde_json::Value {
    let base = &state.config.site_base_url;
    serde_json::json!({
        "links": [
            { "rel": SCHEMA_2_0, "href": format!("{base}/nodeinfo/2.0") },
            { "rel": SCHEMA_2_1, "href": format!("{base}/nodeinfo/2.1") },
        ]
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub version: &'static str,
    pub software: Software,
    pub protocols: Vec<&'static str>,
    pub services: Services,
    pub open_registrations: bool,
    pub usage: Usage,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Software {
    pub name: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Services {
    pub inbound: Vec<&'static str>,
    pub outbound: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub users: UserStats,
    pub local_posts: u64,
    pub local_comments: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub total: u64,
    pub active_halfyear: Option<u64>,
    pub active_month: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub federation: FederationMetadata,
    pub features: Vec<&'static str>,
    pub content_types: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationMetadata {
    pub enabled: bool,
    pub allow_list: Option<Vec<String>>,
    pub block_list: Vec<String>,
}

/// Builds the NodeInfo descriptor for either supported version. The 2.1
/// document differs from 2.0 only in its declared `version` field.
pub async fn nodeinfo(state: &FederationRuntime, version: &'static str) -> Result<NodeInfo> {
    let total_users = state.store.list(ACTORS_NAMESPACE).await?.len() as u64;

    Ok(NodeInfo {
        version,
        software: Software {
            name: "actiserve",
            version: option_env!("CARGO_PKG_VERSION").unwrap_or("unknown"),
        },
        protocols: vec!["activitypub"],
        services: Services {
            inbound: vec![],
            outbound: vec!["atom1.0", "rss2.0"],
        },
        open_registrations: false,
        usage: Usage {
            users: UserStats {
                total: total_users,
                active_halfyear: None,
                active_month: None,
            },
            // This core doesn't own the host application's content store, so
            // it has no authored-post/comment counts of its own to report.
            local_posts: 0,
            local_comments: 0,
        },
        metadata: Metadata {
            federation: FederationMetadata {
                enabled: state.config.federation_enabled,
                allow_list: None,
                block_list: vec![],
            },
            features: vec!["activitypub", "webfinger", "http-signatures", "mastodon-api-compat"],
            content_types: vec!["Article", "Note", "Image", "Video", "Page", "Event"],
        },
    })
}
