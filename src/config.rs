use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{ErrorKind, Write},
    net::Ipv4Addr,
    path::{Path, PathBuf},
};
use url::Url;

use crate::Error;

/// Process-wide configuration. Derives every local URI used elsewhere in
/// the core, so there is exactly one place that knows what a "local" actor
/// URI looks like. Changing it mid-process (tests construct a fresh one
/// per case) invalidates any cache keyed off the old values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// IPv4 address to listen on.
    #[serde(default = "default_listen")]
    pub listen: Ipv4Addr,
    /// Port to run the service on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Scheme+host prefix for all local URIs. Trailing slash is stripped on load.
    pub site_base_url: String,
    #[serde(default = "default_true")]
    pub federation_enabled: bool,
    #[serde(default = "default_visibility")]
    pub default_visibility: String,
    #[serde(default)]
    pub auto_approve_follows: bool,
    #[serde(default = "default_max_retries")]
    pub max_delivery_retries: u32,
    #[serde(default = "default_timeout_ms")]
    pub federation_timeout: u64,
    #[serde(default = "default_true")]
    pub signature_verification_enabled: bool,
    #[serde(default = "default_key_cache_ttl")]
    pub actor_key_cache_ttl: u64,
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
    #[serde(default = "default_max_tags")]
    pub max_tags: usize,
    #[serde(default = "default_max_mentions")]
    pub max_mentions: usize,
    #[serde(default = "default_max_attachments")]
    pub max_attachments: usize,
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Root of on-disk state (see the `Store` namespace layout in `store.rs`).
    #[serde(default = "default_activitypub_dir")]
    pub activitypub_dir: PathBuf,
}

fn default_listen() -> Ipv4Addr {
    Ipv4Addr::new(0, 0, 0, 0)
}
fn default_port() -> u16 {
    4242
}
fn default_true() -> bool {
    true
}
fn default_visibility() -> String {
    "public".into()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_key_cache_ttl() -> u64 {
    3600
}
fn default_max_content_length() -> usize {
    100_000
}
fn default_max_tags() -> usize {
    32
}
fn default_max_mentions() -> usize {
    32
}
fn default_max_attachments() -> usize {
    8
}
fn default_max_upload_size() -> usize {
    10 * 1024 * 1024
}
fn default_page_size() -> usize {
    20
}
fn default_max_page_size() -> usize {
    100
}
fn default_activitypub_dir() -> PathBuf {
    PathBuf::from(".activitypub")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            site_base_url: "https://example.com".into(),
            federation_enabled: default_true(),
            default_visibility: default_visibility(),
            auto_approve_follows: false,
            max_delivery_retries: default_max_retries(),
            federation_timeout: default_timeout_ms(),
            signature_verification_enabled: default_true(),
            actor_key_cache_ttl: default_key_cache_ttl(),
            max_content_length: default_max_content_length(),
            max_tags: default_max_tags(),
            max_mentions: default_max_mentions(),
            max_attachments: default_max_attachments(),
            max_upload_size: default_max_upload_size(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            activitypub_dir: default_activitypub_dir(),
        }
    }
}

impl Config {
    /// Try to load our config file if it exists, otherwise write out our
    /// default config and return that.
    ///
    /// Panics if the config file that is present is invalid or if we are
    /// unable to write out our default config.
    pub fn load_or_write_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(content) => {
                let mut cfg: Self = serde_yaml::from_str(&content)
                    .unwrap_or_else(|e| panic!("unable to load config file: {e}"));
                cfg.site_base_url = cfg.site_base_url.trim_end_matches('/').to_owned();
                cfg
            }

            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut f = File::create(path)
                    .unwrap_or_else(|e| panic!("unable to create config file: {e}"));

                let cfg = Self::default();
                f.write_all(
                    serde_yaml::to_string(&cfg)
                        .unwrap_or_else(|e| panic!("unable to serialize config: {e}"))
                        .as_bytes(),
                )
                .unwrap_or_else(|e| panic!("unable to write config file: {e}"));

                cfg
            }

            Err(e) => panic!("unable to read config file: {e}"),
        }
    }

    /// The bare `host[:port]` this process listens on, distinct from
    /// `site_base_url` (which is what remote servers see us as).
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.listen, self.port)
    }

    pub fn instance_domain(&self) -> Result<String, Error> {
        let url = Url::parse(&self.site_base_url).map_err(|_| Error::InvalidUri {
            uri: self.site_base_url.clone(),
        })?;
        Ok(url.host_str().unwrap_or_default().to_owned())
    }

    pub fn is_local_uri(&self, uri: &str) -> bool {
        match (Url::parse(uri), Url::parse(&self.site_base_url)) {
            (Ok(u), Ok(base)) => u.host_str() == base.host_str(),
            _ => false,
        }
    }

    pub fn actor_uri(&self, handle: &str) -> String {
        format!("{}/@{handle}", self.site_base_url)
    }

    pub fn inbox_uri(&self, handle: &str) -> String {
        format!("{}/inbox", self.actor_uri(handle))
    }

    pub fn outbox_uri(&self, handle: &str) -> String {
        format!("{}/outbox", self.actor_uri(handle))
    }

    pub fn followers_uri(&self, handle: &str) -> String {
        format!("{}/followers", self.actor_uri(handle))
    }

    pub fn following_uri(&self, handle: &str) -> String {
        format!("{}/following", self.actor_uri(handle))
    }

    pub fn liked_uri(&self, handle: &str) -> String {
        format!("{}/liked", self.actor_uri(handle))
    }

    pub fn webfinger_resource(&self, handle: &str) -> Result<String, Error> {
        Ok(format!("acct:{handle}@{}", self.instance_domain()?))
    }

    /// `{base}/c/{handle}` — the Group/community variant of an actor URI.
    pub fn group_uri(&self, handle: &str) -> String {
        format!("{}/c/{handle}", self.site_base_url)
    }
}
