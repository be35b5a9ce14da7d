//! Durable state, abstracted behind a small trait so tests can run against
//! memory instead of the filesystem.
//!
//! Every piece of mutable state this core keeps (actors, follower lists,
//! delivery queues, notifications, the remote-content mirror) lives under a
//! `(namespace, key)` pair. The default [`AcidJsonStore`] keeps one JSON file
//! per pair under `Config::activitypub_dir`, written atomically via
//! `acidjson` so a crash mid-write can never leave a half-written record.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use acidjson::AcidJson;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Error, Result};

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<Value>>;
    async fn put_raw(&self, namespace: &str, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, namespace: &str, key: &str) -> Result<()>;
    async fn list(&self, namespace: &str) -> Result<Vec<String>>;
}

/// Typed convenience layer over [`Store`]'s raw JSON operations.
#[async_trait]
pub trait StoreExt: Store {
    async fn get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>> {
        match self.get_raw(namespace, key).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn put<T: Serialize + Sync>(&self, namespace: &str, key: &str, value: &T) -> Result<()> {
        self.put_raw(namespace, key, serde_json::to_value(value)?).await
    }
}

impl<T: Store + ?Sized> StoreExt for T {}

fn sanitize(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect()
}

/// Filesystem-backed store. One file per `(namespace, key)`, under
/// `root/{namespace}/{key}.json`, each wrapped in its own `AcidJson` handle
/// so concurrent readers and writers never observe a torn file.
pub struct AcidJsonStore {
    root: PathBuf,
    handles: RwLock<HashMap<String, Arc<AcidJson<Value>>>>,
}

impl AcidJsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            handles: RwLock::new(HashMap::new()),
        }
    }

    fn path_for(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(sanitize(namespace)).join(format!("{}.json", sanitize(key)))
    }

    async fn handle_for(&self, namespace: &str, key: &str) -> Result<Arc<AcidJson<Value>>> {
        let path = self.path_for(namespace, key);
        let cache_key = path.to_string_lossy().into_owned();

        if let Some(handle) = self.handles.read().await.get(&cache_key) {
            return Ok(handle.clone());
        }

        let mut handles = self.handles.write().await;
        if let Some(handle) = handles.get(&cache_key) {
            return Ok(handle.clone());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let handle = Arc::new(if path.exists() {
            AcidJson::open(&path).map_err(|e| Error::Storage(e.to_string()))?
        } else {
            AcidJson::open_or_create(&path, Value::Null).map_err(|e| Error::Storage(e.to_string()))?
        });

        handles.insert(cache_key, handle.clone());
        Ok(handle)
    }
}

#[async_trait]
impl Store for AcidJsonStore {
    async fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let path = self.path_for(namespace, key);
        if !path.exists() {
            return Ok(None);
        }
        let handle = self.handle_for(namespace, key).await?;
        let value = handle.read().clone();
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn put_raw(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        let handle = self.handle_for(namespace, key).await?;
        handle.write(|v| *v = value).map_err(|e| Error::Storage(e.to_string()))
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        let path = self.path_for(namespace, key);
        self.handles.write().await.remove(&path.to_string_lossy().into_owned());
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        let dir = self.root.join(sanitize(namespace));
        if !dir.exists() {
            return Ok(vec![]);
        }
        let mut keys = vec![];
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if let Some(name) = entry.path().file_stem().and_then(|s| s.to_str()) {
                keys.push(name.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

/// In-memory store used by tests, and by nothing else.
#[derive(Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, HashMap<String, Value>>>,
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_raw(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        Ok(self.data.read().await.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    async fn put_raw(&self, namespace: &str, key: &str, value: Value) -> Result<()> {
        self.data
            .write()
            .await
            .entry(namespace.to_owned())
            .or_default()
            .insert(key.to_owned(), value);
        Ok(())
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<()> {
        if let Some(ns) = self.data.write().await.get_mut(namespace) {
            ns.remove(key);
        }
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .await
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
