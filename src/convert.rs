//! Converts the host site's own content (posts, events, media) into
//! ActivityStreams objects, and computes the `to`/`cc` addressing that
//! follows from a piece of content's visibility.

use chrono::{DateTime, Utc};

use crate::{
    config::Config,
    mentions::{self, Mention},
    model::{Attachment, EventExtra, EventObject, Object, ObjectCommon, Place, Tag, TagKind, AP_PUBLIC},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Unlisted,
    Followers,
    Private,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Note,
    Article,
    Page,
    Image,
    Audio,
    Document,
    Video,
    Event,
}

#[derive(Debug, Clone)]
pub struct Content {
    pub id: String,
    pub kind: ContentKind,
    pub author_handle: String,
    pub title: Option<String>,
    pub body: String,
    pub summary: Option<String>,
    pub visibility: Visibility,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub in_reply_to: Option<String>,
    pub sensitive: bool,
    pub attachments: Vec<Attachment>,
    pub url: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Corresponds to `frontmatter.noFederate`: the author opted this piece
    /// of content out of federation even though it would otherwise qualify.
    pub no_federate: bool,
}

/// `typePath` segment for the object-id derivation, keyed on content kind.
fn type_path(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Article => "blog",
        ContentKind::Note => "notes",
        ContentKind::Page => "products",
        ContentKind::Event => "events",
        ContentKind::Video => "videos",
        ContentKind::Image => "images",
        ContentKind::Document => "docs",
        ContentKind::Audio => "content",
    }
}

pub fn object_id(config: &Config, content: &Content) -> String {
    format!("{}/ap/content/{}/{}", config.site_base_url, type_path(content.kind), content.id)
}

/// Whether this content should be federated at all. False for
/// `private`/`direct` visibility, content marked `noFederate`, or content
/// with no `publishedAt` yet (a draft).
pub fn should_federate(content: &Content) -> bool {
    if matches!(content.visibility, Visibility::Private | Visibility::Direct) {
        return false;
    }
    if content.no_federate {
        return false;
    }
    content.published.is_some()
}

/// The `to`/`cc` pair implied by a visibility level, given the author's
/// followers collection and any explicitly-mentioned remote actors.
pub fn addressing(config: &Config, content: &Content, mentioned: &[String]) -> (Vec<String>, Vec<String>) {
    let followers = config.followers_uri(&content.author_handle);

    match content.visibility {
        Visibility::Public => (vec![AP_PUBLIC.to_owned()], vec![followers].into_iter().chain(mentioned.iter().cloned()).collect()),
        Visibility::Unlisted => (vec![followers], vec![AP_PUBLIC.to_owned()].into_iter().chain(mentioned.iter().cloned()).collect()),
        Visibility::Followers => (vec![followers], mentioned.to_vec()),
        Visibility::Private => (mentioned.to_vec(), vec![]),
        Visibility::Direct => (mentioned.to_vec(), vec![]),
    }
}

fn tags_for(config: &Config, mentions: &[Mention], hashtags: &[String]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = mentions
        .iter()
        .map(|m| match &m.domain {
            Some(domain) => Tag {
                kind: TagKind::Mention,
                href: format!("https://{domain}/@{}", m.handle),
                name: format!("@{}@{domain}", m.handle),
            },
            None => Tag {
                kind: TagKind::Mention,
                href: format!("{}/@{}", config.site_base_url, m.handle),
                name: format!("@{}", m.handle),
            },
        })
        .collect();

    tags.extend(hashtags.iter().map(|tag| Tag {
        kind: TagKind::Hashtag,
        href: format!("{}/tags/{}", config.site_base_url, tag.to_lowercase()),
        name: format!("#{tag}"),
    }));

    tags
}

/// Builds the ActivityStreams object for a piece of content, including its
/// `to`/`cc` addressing and derived mention/hashtag tags.
pub fn to_object(config: &Config, content: &Content, mentioned: &[String]) -> Object {
    let (to, cc) = addressing(config, content, mentioned);
    let mentions = mentions::parse_mentions(&content.body);
    let hashtags = mentions::parse_hashtags(&content.body);

    let common = ObjectCommon {
        id: object_id(config, content),
        attributed_to: Some(config.actor_uri(&content.author_handle)),
        published: content.published,
        updated: content.updated,
        to,
        cc,
        url: content.url.clone(),
        tag: tags_for(config, &mentions, &hashtags),
        attachment: content.attachments.clone(),
        content: Some(content.body.clone()),
        summary: content.summary.clone(),
        name: content.title.clone(),
        sensitive: content.sensitive,
        in_reply_to: content.in_reply_to.clone(),
    };

    match content.kind {
        ContentKind::Note => Object::Note(common),
        ContentKind::Article => Object::Article(common),
        ContentKind::Page => Object::Page(common),
        ContentKind::Image => Object::Image(common),
        ContentKind::Audio => Object::Audio(common),
        ContentKind::Document => Object::Document(common),
        ContentKind::Video => Object::Video(crate::model::VideoObject {
            common,
            extra: Default::default(),
        }),
        ContentKind::Event => Object::Event(EventObject {
            common,
            extra: EventExtra {
                start_time: content.starts_at,
                end_time: content.ends_at,
                location: content.location.clone().map(|name| Place { kind: "Place".into(), name }),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            site_base_url: "https://example.com".into(),
            ..Default::default()
        }
    }

    fn content(visibility: Visibility) -> Content {
        Content {
            id: "1".into(),
            kind: ContentKind::Note,
            author_handle: "alice".into(),
            title: None,
            body: "hello @bob@remote.example #rust".into(),
            summary: None,
            visibility,
            published: Some(Utc::now()),
            updated: None,
            in_reply_to: None,
            sensitive: false,
            attachments: vec![],
            url: None,
            location: None,
            starts_at: None,
            ends_at: None,
            no_federate: false,
        }
    }

    #[test]
    fn public_visibility_addresses_public_and_followers() {
        let (to, cc) = addressing(&config(), &content(Visibility::Public), &[]);
        assert_eq!(to, vec![AP_PUBLIC.to_owned()]);
        assert_eq!(cc, vec!["https://example.com/@alice/followers".to_owned()]);
    }

    #[test]
    fn direct_visibility_only_addresses_mentioned_recipients() {
        let mentioned = vec!["https://remote.example/@bob".to_owned()];
        let (to, cc) = addressing(&config(), &content(Visibility::Direct), &mentioned);
        assert_eq!(to, mentioned);
        assert!(cc.is_empty());
    }

    #[test]
    fn object_carries_mention_and_hashtag_tags() {
        let object = to_object(&config(), &content(Visibility::Public), &[]);
        let common = object.common().unwrap();
        assert_eq!(common.tag.len(), 2);
        assert!(common.tag.iter().any(|t| t.kind == TagKind::Mention));
        assert!(common.tag.iter().any(|t| t.kind == TagKind::Hashtag));
    }

    #[test]
    fn local_mentions_get_a_tag_too() {
        let mut c = content(Visibility::Public);
        c.body = "hey @carol, welcome".into();
        let object = to_object(&config(), &c, &[]);
        let common = object.common().unwrap();
        let mention = common.tag.iter().find(|t| t.kind == TagKind::Mention).unwrap();
        assert_eq!(mention.href, "https://example.com/@carol");
        assert_eq!(mention.name, "@carol");
    }

    #[test]
    fn object_id_uses_the_type_path_for_its_kind() {
        let mut c = content(Visibility::Public);
        c.id = "test-post".into();
        c.kind = ContentKind::Article;
        assert_eq!(object_id(&config(), &c), "https://example.com/ap/content/blog/test-post");
    }

    #[test]
    fn should_federate_rejects_private_direct_no_federate_and_unpublished() {
        let mut c = content(Visibility::Private);
        assert!(!should_federate(&c));
        c.visibility = Visibility::Direct;
        assert!(!should_federate(&c));
        c.visibility = Visibility::Public;
        c.no_federate = true;
        assert!(!should_federate(&c));
        c.no_federate = false;
        c.published = None;
        assert!(!should_federate(&c));
        c.published = Some(Utc::now());
        assert!(should_federate(&c));
    }
}
