use std::path::Path;

use chrono::Utc;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};

use super::{CacheBackend, CacheItem, CacheValue, Expiration, Result};

/// Key layout:
/// - `entries`: {cache_id} -> CacheItem (JSON)
/// - `tags`: {tag}\0{cache_id} -> empty
const TAG_SEPARATOR: u8 = 0;

fn encode_tag_key(tag: &str, id: &str) -> Vec<u8> {
    let mut key = encode_tag_prefix(tag);
    key.extend_from_slice(id.as_bytes());
    key
}

fn encode_tag_prefix(tag: &str) -> Vec<u8> {
    let mut key = tag.as_bytes().to_vec();
    key.push(TAG_SEPARATOR);
    key
}

/// Persistent cache on a Fjall keyspace
#[derive(Clone)]
pub struct FjallCache {
    keyspace: Keyspace,
    entries: PartitionHandle,
    tags: PartitionHandle,
}

impl FjallCache {
    /// Open or create a cache at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening cache store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let entries = keyspace.open_partition("entries", PartitionCreateOptions::default())?;
        let tags = keyspace.open_partition("tags", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            entries,
            tags,
        })
    }

    fn read_item(&self, id: &str) -> Result<Option<CacheItem>> {
        match self.entries.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn remove_item(&self, id: &str) -> Result<bool> {
        let Some(item) = self.read_item(id)? else {
            return Ok(false);
        };
        for tag in &item.tags {
            self.tags.remove(encode_tag_key(tag, id))?;
        }
        self.entries.remove(id.as_bytes())?;
        Ok(true)
    }
}

impl CacheBackend for FjallCache {
    fn get(&self, id: &str) -> Result<Option<CacheValue>> {
        let now = Utc::now().timestamp();
        Ok(self
            .read_item(id)?
            .filter(|item| !item.expiration.is_expired(now))
            .map(|item| item.value))
    }

    fn set(
        &self,
        id: &str,
        value: CacheValue,
        expiration: Expiration,
        tags: &[String],
    ) -> Result<()> {
        // Stale tag links from a previous write would survive otherwise
        self.remove_item(id)?;

        let item = CacheItem {
            value,
            expiration,
            tags: tags.to_vec(),
        };
        self.entries.insert(id.as_bytes(), serde_json::to_vec(&item)?)?;
        for tag in tags {
            self.tags.insert(encode_tag_key(tag, id), Vec::<u8>::new())?;
        }
        debug!(cache_id = id, "Cached item");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.remove_item(id)?;
        Ok(())
    }

    fn invalidate_tags(&self, tags: &[String]) -> Result<usize> {
        let mut removed = 0;
        for tag in tags {
            let prefix = encode_tag_prefix(tag);
            let mut ids = Vec::new();
            for pair in self.tags.prefix(&prefix) {
                let (key, _) = pair?;
                if let Ok(id) = std::str::from_utf8(&key[prefix.len()..]) {
                    ids.push(id.to_string());
                }
            }
            for id in ids {
                if self.remove_item(&id)? {
                    removed += 1;
                }
            }
        }
        debug!(removed, "Invalidated cache tags");
        Ok(removed)
    }
    fn flush(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::JsonSchema;
    use tempfile::TempDir;

    fn create_test_cache() -> (FjallCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = FjallCache::open(temp_dir.path().join("cache")).unwrap();
        (cache, temp_dir)
    }

    #[test]
    fn test_set_and_get() {
        let (cache, _temp) = create_test_cache();
        cache
            .set(
                "ns:queries:reports:GET:1",
                CacheValue::Text("{}".to_string()),
                Expiration::after_secs(60),
                &["ns:reports".to_string()],
            )
            .unwrap();

        assert_eq!(
            cache.get("ns:queries:reports:GET:1").unwrap(),
            Some(CacheValue::Text("{}".to_string()))
        );
    }

    #[test]
    fn test_schema_is_stored_permanently() {
        let (cache, _temp) = create_test_cache();
        let schema = JsonSchema::parse(r#"{"type":"object"}"#).unwrap();
        cache
            .set(
                "ns:post_api:schema:report",
                CacheValue::Schema(schema.clone()),
                Expiration::Permanent,
                &[],
            )
            .unwrap();

        assert_eq!(
            cache.get("ns:post_api:schema:report").unwrap(),
            Some(CacheValue::Schema(schema))
        );
    }

    #[test]
    fn test_expired_is_a_miss() {
        let (cache, _temp) = create_test_cache();
        cache
            .set("id", CacheValue::Text(String::new()), Expiration::At(1), &[])
            .unwrap();
        assert!(cache.get("id").unwrap().is_none());
    }

    #[test]
    fn test_invalidate_tags() {
        let (cache, _temp) = create_test_cache();
        let text = || CacheValue::Text("x".to_string());
        cache
            .set("a", text(), Expiration::Permanent, &["ns:reports".to_string()])
            .unwrap();
        cache
            .set("ab", text(), Expiration::Permanent, &["ns:reports".to_string()])
            .unwrap();
        cache
            .set("b", text(), Expiration::Permanent, &["ns:reportsx".to_string()])
            .unwrap();

        let removed = cache.invalidate_tags(&["ns:reports".to_string()]).unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("a").unwrap().is_none());
        assert!(cache.get("ab").unwrap().is_none());
        assert!(cache.get("b").unwrap().is_some());
    }

    #[test]
    fn test_overwrite_drops_old_tags() {
        let (cache, _temp) = create_test_cache();
        let text = || CacheValue::Text("x".to_string());
        cache
            .set("a", text(), Expiration::Permanent, &["old".to_string()])
            .unwrap();
        cache
            .set("a", text(), Expiration::Permanent, &["new".to_string()])
            .unwrap();

        assert_eq!(cache.invalidate_tags(&["old".to_string()]).unwrap(), 0);
        assert!(cache.get("a").unwrap().is_some());
    }

    #[test]
    fn test_reopen_keeps_entries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cache");
        {
            let cache = FjallCache::open(&path).unwrap();
            cache
                .set("id", CacheValue::Text("kept".to_string()), Expiration::Permanent, &[])
                .unwrap();
            cache.flush().unwrap();
        }

        let cache = FjallCache::open(&path).unwrap();
        assert_eq!(
            cache.get("id").unwrap(),
            Some(CacheValue::Text("kept".to_string()))
        );
    }
}
