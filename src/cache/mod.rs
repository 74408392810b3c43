//! Response cache
//!
//! Raw API bodies are cached under ids derived from the sanitized payload
//! fingerprint, with an absolute expiration timestamp and a set of tags.
//! POST API schemas are cached permanently.
//!
//! Two backends are provided: [`MemoryCache`] for a single process and
//! [`FjallCache`] persisted on disk.

mod store;

pub use store::FjallCache;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use thiserror::Error;

use crate::schema::JsonSchema;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Fjall error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Value stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CacheValue {
    /// Undecoded response body, `""` marks a failed request
    Text(String),
    Schema(JsonSchema),
}

/// When a cache item stops being served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiration {
    Permanent,
    /// Unix timestamp in seconds
    At(i64),
}

impl Expiration {
    /// Expire `seconds` from now
    pub fn after_secs(seconds: u64) -> Self {
        let seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        Expiration::At(Utc::now().timestamp().saturating_add(seconds))
    }

    pub fn is_expired(&self, now: i64) -> bool {
        match self {
            Expiration::Permanent => false,
            Expiration::At(at) => *at <= now,
        }
    }
}

/// Stored cache record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem {
    pub value: CacheValue,
    pub expiration: Expiration,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Tag-aware key/value cache
pub trait CacheBackend: Send + Sync {
    /// Fetch a live item, expired items read as `None`
    fn get(&self, id: &str) -> Result<Option<CacheValue>>;

    fn set(&self, id: &str, value: CacheValue, expiration: Expiration, tags: &[String])
    -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;

    /// Drop every item carrying any of the tags, returns the number removed
    fn invalidate_tags(&self, tags: &[String]) -> Result<usize>;

    /// Make pending writes durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryCache {
    items: RwLock<HashMap<String, CacheItem>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, id: &str) -> Result<Option<CacheValue>> {
        let items = self.items.read().map_err(|_| CacheError::Poisoned)?;
        let now = Utc::now().timestamp();
        Ok(items
            .get(id)
            .filter(|item| !item.expiration.is_expired(now))
            .map(|item| item.value.clone()))
    }

    fn set(
        &self,
        id: &str,
        value: CacheValue,
        expiration: Expiration,
        tags: &[String],
    ) -> Result<()> {
        let mut items = self.items.write().map_err(|_| CacheError::Poisoned)?;
        items.insert(
            id.to_string(),
            CacheItem {
                value,
                expiration,
                tags: tags.to_vec(),
            },
        );
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut items = self.items.write().map_err(|_| CacheError::Poisoned)?;
        items.remove(id);
        Ok(())
    }

    fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let tags: HashSet<&str> = tags.iter().map(String::as_str).collect();
        let mut items = self.items.write().map_err(|_| CacheError::Poisoned)?;
        let before = items.len();
        items.retain(|_, item| !item.tags.iter().any(|tag| tags.contains(tag.as_str())));
        Ok(before - items.len())
    }
}
