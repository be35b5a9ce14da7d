//! Parsing and linkification of `@user[@domain]` mentions and `#hashtag`s
//! out of plain post content.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[^\w@/])@([a-zA-Z0-9_]+)(?:@([a-zA-Z0-9.-]+))?").unwrap());
static HASHTAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|[^\w&])#([a-zA-Z0-9_]+)").unwrap());
static ANCHOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>.*?</a>").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mention {
    pub handle: String,
    pub domain: Option<String>,
}

impl Mention {
    /// The canonical lowercase key used for deduplication: `handle@domain`
    /// or bare `handle` for a local mention.
    fn dedup_key(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}@{}", self.handle.to_lowercase(), domain.to_lowercase()),
            None => self.handle.to_lowercase(),
        }
    }
}

/// Returns mentions in first-occurrence order, deduplicated case-insensitively.
pub fn parse_mentions(text: &str) -> Vec<Mention> {
    let mut seen = std::collections::HashSet::new();
    let mut mentions = vec![];

    for caps in MENTION_RE.captures_iter(text) {
        let mention = Mention {
            handle: caps[1].to_owned(),
            domain: caps.get(2).map(|m| m.as_str().to_owned()),
        };
        if seen.insert(mention.dedup_key()) {
            mentions.push(mention);
        }
    }

    mentions
}

/// Returns hashtags (without the `#`) in first-occurrence order, deduped
/// case-insensitively but keeping the first casing seen.
pub fn parse_hashtags(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tags = vec![];

    for caps in HASHTAG_RE.captures_iter(text) {
        let tag = caps[1].to_owned();
        if seen.insert(tag.to_lowercase()) {
            tags.push(tag);
        }
    }

    tags
}

/// Rewrites `@mention`s and `#hashtag`s into anchor tags, skipping any text
/// already inside an existing `<a>...</a>` range so we never double-link.
pub fn linkify(
    text: &str,
    mention_href: impl Fn(&Mention) -> Option<String>,
    hashtag_href: impl Fn(&str) -> String,
) -> String {
    let protected: Vec<(usize, usize)> = ANCHOR_RE.find_iter(text).map(|m| (m.start(), m.end())).collect();
    let inside_protected = |pos: usize| protected.iter().any(|(s, e)| pos >= *s && pos < *e);

    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    let mut replacements: Vec<(usize, usize, String)> = vec![];

    for caps in MENTION_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if inside_protected(whole.start()) {
            continue;
        }
        let handle_match = caps.get(1).unwrap();
        let mention = Mention {
            handle: caps[1].to_owned(),
            domain: caps.get(2).map(|m| m.as_str().to_owned()),
        };
        if let Some(href) = mention_href(&mention) {
            let end = caps.get(2).map(|m| m.end()).unwrap_or(handle_match.end());
            let label = &text[handle_match.start() - 1..end];
            replacements.push((
                handle_match.start() - 1,
                end,
                format!(r#"<a href="{href}" class="mention">{label}</a>"#),
            ));
        }
    }

    for caps in HASHTAG_RE.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        if inside_protected(whole.start()) {
            continue;
        }
        let tag_match = caps.get(1).unwrap();
        let href = hashtag_href(&caps[1]);
        replacements.push((
            tag_match.start() - 1,
            tag_match.end(),
            format!(r#"<a href="{href}" class="hashtag">#{}</a>"#, &caps[1]),
        ));
    }

    replacements.sort_by_key(|(start, ..)| *start);

    for (start, end, replacement) in replacements {
        if start < last {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(&replacement);
        last = end;
    }
    out.push_str(&text[last..]);

    out
}

pub fn resolve_hrefs(mentions: &[Mention], table: &HashMap<String, String>) -> HashMap<String, String> {
    mentions
        .iter()
        .filter_map(|m| table.get(&m.dedup_key()).map(|href| (m.dedup_key(), href.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_local_and_remote_mentions() {
        let mentions = parse_mentions("hello @alice and @bob@remote.example!");
        assert_eq!(
            mentions,
            vec![
                Mention { handle: "alice".into(), domain: None },
                Mention { handle: "bob".into(), domain: Some("remote.example".into()) },
            ]
        );
    }

    #[test]
    fn dedups_mentions_case_insensitively() {
        let mentions = parse_mentions("@Alice hi @alice again");
        assert_eq!(mentions.len(), 1);
        assert_eq!(mentions[0].handle, "Alice");
    }

    #[test]
    fn parses_hashtags_preserving_first_casing() {
        let tags = parse_hashtags("#Rust is great, also #rust and #WASM");
        assert_eq!(tags, vec!["Rust".to_owned(), "WASM".to_owned()]);
    }

    #[test]
    fn linkify_rewrites_mentions_and_hashtags() {
        let text = "hi @alice check out #rust";
        let html = linkify(
            &text,
            |m| Some(format!("https://example.com/@{}", m.handle)),
            |tag| format!("https://example.com/tags/{}", tag.to_lowercase()),
        );
        assert!(html.contains(r#"<a href="https://example.com/@alice" class="mention">@alice</a>"#));
        assert!(html.contains(r#"<a href="https://example.com/tags/rust" class="hashtag">#rust</a>"#));
    }

    #[test]
    fn linkify_skips_text_already_inside_an_anchor() {
        let text = r#"<a href="https://example.com">@alice</a> and @bob"#;
        let html = linkify(&text, |m| Some(format!("https://example.com/@{}", m.handle)), |t| t.to_owned());
        assert_eq!(html.matches("@alice").count(), 1);
        assert!(html.contains(r#"<a href="https://example.com/@bob" class="mention">@bob</a>"#));
    }
}
