//! WebFinger (RFC 7033) account discovery: resolving `acct:handle@domain`
//! or a profile URL down to the actor document and a handful of well-known
//! relations. Pure lookup logic; `routes::well_known` extracts the query
//! parameter and turns `None` into a 404.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{actors, state::FederationRuntime, Error, Result};

static HANDLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebfingerResource {
    pub subject: String,
    pub aliases: Vec<String>,
    pub links: Vec<WebfingerLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebfingerLink {
    pub rel: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Accepts `acct:handle@domain` or `https://domain/@handle`.
fn parse_resource(resource: &str) -> Result<(String, String)> {
    if let Some(rest) = resource.strip_prefix("acct:") {
        let (handle, domain) = rest
            .split_once('@')
            .ok_or_else(|| Error::BadRequest(format!("malformed webfinger resource: {resource}")))?;
        return Ok((handle.to_owned(), domain.to_owned()));
    }

    if let Ok(url) = url::Url::parse(resource) {
        if let Some(domain) = url.host_str() {
            if let Some(handle) = url.path().strip_prefix("/@") {
                return Ok((handle.trim_end_matches('/').to_owned(), domain.to_owned()));
            }
        }
    }

    Err(Error::BadRequest(format!("malformed webfinger resource: {resource}")))
}

/// Resolves a WebFinger `resource` parameter to the matching local actor,
/// or `None` if the domain doesn't match us or the handle doesn't exist.
pub async fn webfinger(state: &FederationRuntime, resource: &str) -> Result<Option<WebfingerResource>> {
    let (handle, domain) = parse_resource(resource)?;
    if !HANDLE_RE.is_match(&handle) {
        return Ok(None);
    }

    let instance_domain = state.config.instance_domain()?;
    if domain != instance_domain {
        return Ok(None);
    }

    let exists = actors::get(state, &handle).await.is_ok() && (state.resolve_user)(&handle);
    if !exists {
        return Ok(None);
    }

    let actor_uri = state.config.actor_uri(&handle);
    let profile_url = actor_uri.clone();

    Ok(Some(WebfingerResource {
        subject: state.config.webfinger_resource(&handle)?,
        aliases: vec![actor_uri.clone(), profile_url.clone()],
        links: vec![
            WebfingerLink {
                rel: "self".into(),
                kind: Some("application/activity+json".into()),
                href: Some(actor_uri),
                template: None,
            },
            WebfingerLink {
                rel: "http://webfinger.net/rel/profile-page".into(),
                kind: Some("text/html".into()),
                href: Some(profile_url),
                template: None,
            },
            WebfingerLink {
                rel: "http://ostatus.org/schema/1.0/subscribe".into(),
                kind: None,
                href: None,
                template: Some(format!("{}/authorize_interaction?uri={{uri}}", state.config.site_base_url)),
            },
        ],
    }))
}

/// Body for `/.well-known/host-meta`, the older XRD-based discovery
/// mechanism some implementations still probe before trying WebFinger.
pub fn host_meta(state: &FederationRuntime) -> String {
    format!(
        r#"<?xml version="1.0"?>
<XRD xmlns="http://docs.oasis-open.org/ns/xri/xrd-1.0">
  <Link rel="lrdd" type="application/xrd+xml" template="{base}/.well-known/webfinger?resource={{uri}}"/>
</XRD>"#,
        base = state.config.site_base_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{actors::StoredActor, config::Config, model::ActorKind, store::InMemoryStore};
    use std::sync::Arc;

    async fn test_state() -> FederationRuntime {
        let config = Config {
            site_base_url: "https://example.com".into(),
            ..Default::default()
        };
        let state = FederationRuntime::new(config, Arc::new(InMemoryStore::default()));
        let actor = StoredActor::generate("alice", ActorKind::Person).unwrap();
        actors::save(&state, &actor).await.unwrap();
        state
    }

    #[test]
    fn parses_acct_and_url_forms() {
        assert_eq!(
            parse_resource("acct:alice@example.com").unwrap(),
            ("alice".to_owned(), "example.com".to_owned())
        );
        assert_eq!(
            parse_resource("https://example.com/@alice").unwrap(),
            ("alice".to_owned(), "example.com".to_owned())
        );
    }

    #[tokio::test]
    async fn resolves_a_known_local_handle() {
        let state = test_state().await;
        let resource = webfinger(&state, "acct:alice@example.com").await.unwrap();
        assert!(resource.is_some());
        assert_eq!(resource.unwrap().subject, "acct:alice@example.com");
    }

    #[tokio::test]
    async fn unknown_handle_resolves_to_none() {
        let state = test_state().await;
        let resource = webfinger(&state, "acct:bob@example.com").await.unwrap();
        assert!(resource.is_none());
    }

    #[tokio::test]
    async fn mismatched_domain_resolves_to_none() {
        let state = test_state().await;
        let resource = webfinger(&state, "acct:alice@other.example").await.unwrap();
        assert!(resource.is_none());
    }
}
