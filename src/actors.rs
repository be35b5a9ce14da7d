//! Local actor identities: keypair generation, the private record kept in
//! the store, and the public Actor document served to the rest of the
//! fediverse.

use rand::rngs::OsRng;
use rsa::{
    pkcs1v15::SigningKey,
    pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    RsaPrivateKey, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use url::Url;

use crate::{
    config::Config,
    model::{self, Actor, ActorKind, Endpoints, PropertyValue, PublicKey},
    state::FederationRuntime,
    Error, Result,
};

const RSA_KEY_BITS: usize = 2048;
const NAMESPACE: &str = "actors";
const GROUP_NAMESPACE: &str = "groups";

/// The private record behind a served [`Actor`] document. Never serialized
/// into a response; see [`StoredActor::to_public_document`] for that.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredActor {
    pub handle: String,
    pub kind: ActorKind,
    pub private_key_pem: String,
    pub public_key_pem: String,
    pub name: Option<String>,
    pub summary: Option<String>,
    pub icon: Option<Value>,
    pub image: Option<Value>,
    /// `(label, url)` pairs rendered into `attachment` PropertyValues.
    pub links: Vec<(String, String)>,
    pub manually_approves_followers: bool,
    pub discoverable: bool,
}

impl StoredActor {
    fn generate(handle: &str, kind: ActorKind) -> Result<Self> {
        let priv_key =
            RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS).map_err(|e| Error::Federation(e.to_string()))?;
        let pub_key = RsaPublicKey::from(&priv_key);

        Ok(Self {
            handle: handle.to_owned(),
            kind,
            private_key_pem: priv_key
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(|e| Error::Federation(e.to_string()))?
                .to_string(),
            public_key_pem: pub_key
                .to_public_key_pem(LineEnding::LF)
                .map_err(|e| Error::Federation(e.to_string()))?,
            name: None,
            summary: None,
            icon: None,
            image: None,
            links: vec![],
            manually_approves_followers: false,
            discoverable: true,
        })
    }

    pub fn signing_key(&self) -> Result<SigningKey<Sha256>> {
        let key = RsaPrivateKey::from_pkcs8_pem(&self.private_key_pem)
            .map_err(|e| Error::Federation(e.to_string()))?;
        Ok(key.into())
    }

    fn attachments(&self) -> Vec<PropertyValue> {
        self.links
            .iter()
            .map(|(label, url)| expand_social_link(label, url))
            .collect()
    }

    pub fn to_public_document(&self, config: &Config) -> Actor {
        let id = config.actor_uri(&self.handle);
        Actor {
            context: model::actor_context(),
            id: id.clone(),
            kind: self.kind,
            inbox: config.inbox_uri(&self.handle),
            outbox: config.outbox_uri(&self.handle),
            following: config.following_uri(&self.handle),
            followers: config.followers_uri(&self.handle),
            liked: Some(config.liked_uri(&self.handle)),
            featured: None,
            preferred_username: self.handle.clone(),
            public_key: PublicKey {
                id: format!("{id}#main-key"),
                owner: id,
                public_key_pem: self.public_key_pem.clone(),
            },
            name: self.name.clone(),
            summary: self.summary.clone(),
            icon: self.icon.clone(),
            image: self.image.clone(),
            discoverable: Some(self.discoverable),
            indexable: Some(self.discoverable),
            manually_approves_followers: Some(self.manually_approves_followers),
            attachment: self.attachments(),
            endpoints: Some(Endpoints { shared_inbox: None }),
            posting_restricted_to_mods: None,
            moderators: None,
            sensitive: None,
        }
    }

    pub fn to_group_document(&self, config: &Config, moderators: Vec<String>) -> Actor {
        let mut doc = self.to_public_document(config);
        let id = config.group_uri(&self.handle);
        doc.id = id.clone();
        doc.inbox = format!("{id}/inbox");
        doc.outbox = format!("{id}/outbox");
        doc.following = format!("{id}/following");
        doc.followers = format!("{id}/followers");
        doc.liked = None;
        doc.public_key = PublicKey {
            id: format!("{id}#main-key"),
            owner: id,
            public_key_pem: self.public_key_pem.clone(),
        };
        doc.context = model::group_context();
        doc.posting_restricted_to_mods = Some(true);
        doc.moderators = Some(moderators);
        doc.sensitive = Some(false);
        doc
    }
}

/// Known social platforms get a friendlier label and a shortened display
/// value, the way Mastodon profile metadata links do. Anything else falls
/// back to the bare host as the label.
fn expand_social_link(label: &str, url: &str) -> PropertyValue {
    let parsed = Url::parse(url).ok();
    let host = parsed.as_ref().and_then(|u| u.host_str()).unwrap_or_default();
    let path = parsed.as_ref().map(|u| u.path().trim_matches('/')).unwrap_or_default();

    let (name, display) = if host.ends_with("twitter.com") || host.ends_with("x.com") {
        ("Twitter".to_owned(), format!("@{path}"))
    } else if host.ends_with("github.com") {
        ("GitHub".to_owned(), format!("@{path}"))
    } else if host.ends_with("linkedin.com") {
        ("LinkedIn".to_owned(), path.to_owned())
    } else if host.contains("mastodon") || label.eq_ignore_ascii_case("mastodon") {
        ("Mastodon".to_owned(), format!("@{path}@{host}"))
    } else if !label.is_empty() {
        (label.to_owned(), host.to_owned())
    } else {
        (host.to_owned(), host.to_owned())
    };

    PropertyValue {
        kind: "PropertyValue".into(),
        name,
        value: format!(r#"<a href="{url}" rel="me nofollow noreferrer" target="_blank">{display}</a>"#),
    }
}

/// Loads the stored actor for `handle`, generating and persisting a fresh
/// keypair on first use. The key is never regenerated once present.
pub async fn get_or_create(state: &FederationRuntime, handle: &str, kind: ActorKind) -> Result<StoredActor> {
    let lock = state.lock_for(NAMESPACE, handle).await;
    let _guard = lock.lock().await;

    if let Some(actor) = state.store.get::<StoredActor>(NAMESPACE, handle).await? {
        return Ok(actor);
    }

    let actor = StoredActor::generate(handle, kind)?;
    state.store.put(NAMESPACE, handle, &actor).await?;
    Ok(actor)
}

pub async fn get(state: &FederationRuntime, handle: &str) -> Result<StoredActor> {
    state
        .store
        .get::<StoredActor>(NAMESPACE, handle)
        .await?
        .ok_or_else(|| Error::NotFound(format!("actor {handle}")))
}

pub async fn save(state: &FederationRuntime, actor: &StoredActor) -> Result<()> {
    state.store.put(NAMESPACE, &actor.handle, actor).await
}

pub async fn get_or_create_group(state: &FederationRuntime, handle: &str) -> Result<StoredActor> {
    let lock = state.lock_for(GROUP_NAMESPACE, handle).await;
    let _guard = lock.lock().await;

    if let Some(actor) = state.store.get::<StoredActor>(GROUP_NAMESPACE, handle).await? {
        return Ok(actor);
    }

    let actor = StoredActor::generate(handle, ActorKind::Group)?;
    state.store.put(GROUP_NAMESPACE, handle, &actor).await?;
    Ok(actor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::Arc;

    fn test_config() -> Config {
        Config {
            site_base_url: "https://example.com".into(),
            ..Default::default()
        }
    }

    fn test_state() -> FederationRuntime {
        FederationRuntime::new(test_config(), Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn get_or_create_generates_a_usable_key_once() {
        let state = test_state();
        let first = get_or_create(&state, "alice", ActorKind::Person).await.unwrap();
        let second = get_or_create(&state, "alice", ActorKind::Person).await.unwrap();
        assert_eq!(first.public_key_pem, second.public_key_pem);
        assert!(first.signing_key().is_ok());
    }

    #[test]
    fn twitter_link_is_shortened() {
        let pv = expand_social_link("Twitter", "https://twitter.com/alice");
        assert_eq!(pv.name, "Twitter");
        assert!(pv.value.contains("@alice"));
    }

    #[test]
    fn unknown_link_falls_back_to_host() {
        let pv = expand_social_link("", "https://alice.example/blog");
        assert_eq!(pv.name, "alice.example");
    }

    #[tokio::test]
    async fn public_document_has_canonical_ids() {
        let state = test_state();
        let actor = get_or_create(&state, "alice", ActorKind::Person).await.unwrap();
        let doc = actor.to_public_document(&state.config);
        assert_eq!(doc.id, "https://example.com/@alice");
        assert_eq!(doc.inbox, "https://example.com/@alice/inbox");
    }
}
