//! Attachment storage for submitted documents
//! Uses Apache Arrow object_store crate
//!
//! Layout:
//! - `files/{uuid}`: file content
//! - `meta/{uuid}.json`: [`FileMeta`]
//!
//! New uploads are temporary. Files of documents awaiting review are made
//! permanent, everything else goes back to temporary and is purged once it
//! is older than the configured grace period.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::{ObjectStore, path::Path as StoragePath};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{StorageConfig, StorageProvider};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),

    #[error("Invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    /// Eligible for garbage collection
    Temporary,
    Permanent,
}

/// Metadata stored next to each file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMeta {
    pub uuid: Uuid,
    pub filename: String,
    pub mimetype: String,
    pub filesize: usize,
    /// SHA-256 of the content, hex encoded
    pub checksum: String,
    pub state: FileState,
    pub changed_at: DateTime<Utc>,
}

impl FileMeta {
    /// File extension, `bin` when the name has none
    pub fn extension(&self) -> &str {
        match self.filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext,
            _ => "bin",
        }
    }

    /// Preview URL served by the webhook server
    pub fn preview_url(&self, public_url: &str) -> String {
        format!(
            "{}/reliefweb/files/{}.{}",
            public_url.trim_end_matches('/'),
            self.uuid,
            self.extension()
        )
    }
}

/// Attachment store wrapping object_store
#[derive(Clone)]
pub struct AttachmentStore {
    store: Arc<dyn ObjectStore>,
}

impl AttachmentStore {
    /// Create a store with any object_store backend
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Create in-memory storage for testing/development
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        match config.provider {
            StorageProvider::Memory => Ok(Self::in_memory()),
            StorageProvider::Local => {
                std::fs::create_dir_all(&config.root)?;
                let local = object_store::local::LocalFileSystem::new_with_prefix(&config.root)?;
                tracing::info!(root = %config.root.display(), "Using local attachment storage");
                Ok(Self::new(Arc::new(local)))
            }
        }
    }

    /// Store a new file, initially temporary
    pub async fn upload(
        &self,
        filename: &str,
        mimetype: Option<&str>,
        data: Bytes,
    ) -> Result<FileMeta> {
        let meta = FileMeta {
            uuid: Uuid::new_v4(),
            filename: filename.to_string(),
            mimetype: mimetype
                .map(str::to_string)
                .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
            filesize: data.len(),
            checksum: format!("{:x}", Sha256::digest(&data)),
            state: FileState::Temporary,
            changed_at: Utc::now(),
        };

        self.store.put(&data_path(&meta.uuid), data.into()).await?;
        self.write_meta(&meta).await?;

        tracing::info!(uuid = %meta.uuid, filename, size = meta.filesize, "Uploaded attachment");
        Ok(meta)
    }

    pub async fn metadata(&self, uuid: &Uuid) -> Result<FileMeta> {
        let result = self
            .store
            .get(&meta_path(uuid))
            .await
            .map_err(|e| not_found(e, uuid))?;
        let bytes = result.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Metadata and content of a file
    pub async fn download(&self, uuid: &Uuid) -> Result<(FileMeta, Bytes)> {
        let meta = self.metadata(uuid).await?;
        let result = self
            .store
            .get(&data_path(uuid))
            .await
            .map_err(|e| not_found(e, uuid))?;
        let bytes = result.bytes().await?;
        Ok((meta, bytes))
    }

    pub async fn state(&self, uuid: &Uuid) -> Result<FileState> {
        Ok(self.metadata(uuid).await?.state)
    }

    pub async fn checksum(&self, uuid: &Uuid) -> Result<String> {
        Ok(self.metadata(uuid).await?.checksum)
    }

    pub async fn set_permanent(&self, uuid: &Uuid) -> Result<FileMeta> {
        self.set_state(uuid, FileState::Permanent).await
    }

    pub async fn set_temporary(&self, uuid: &Uuid) -> Result<FileMeta> {
        self.set_state(uuid, FileState::Temporary).await
    }

    async fn set_state(&self, uuid: &Uuid, state: FileState) -> Result<FileMeta> {
        let mut meta = self.metadata(uuid).await?;
        if meta.state != state {
            meta.state = state;
            meta.changed_at = Utc::now();
            self.write_meta(&meta).await?;
            tracing::debug!(uuid = %uuid, ?state, "Changed attachment state");
        }
        Ok(meta)
    }

    pub async fn delete(&self, uuid: &Uuid) -> Result<()> {
        for path in [data_path(uuid), meta_path(uuid)] {
            match self.store.delete(&path).await {
                Ok(()) | Err(object_store::Error::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        tracing::info!(uuid = %uuid, "Deleted attachment");
        Ok(())
    }

    /// Delete temporary files unchanged for longer than `older_than`
    pub async fn purge_temporary(&self, older_than: Duration) -> Result<usize> {
        let cutoff = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|age| Utc::now().checked_sub_signed(age))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let objects: Vec<_> = self
            .store
            .list(Some(&StoragePath::from("meta")))
            .try_collect()
            .await?;

        let mut purged = 0;
        for object in objects {
            let bytes = self.store.get(&object.location).await?.bytes().await?;
            let meta: FileMeta = match serde_json::from_slice(&bytes) {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(location = %object.location, error = %e, "Skipping unreadable attachment metadata");
                    continue;
                }
            };

            if meta.state == FileState::Temporary && meta.changed_at <= cutoff {
                self.delete(&meta.uuid).await?;
                purged += 1;
            }
        }

        tracing::info!(purged, "Purged temporary attachments");
        Ok(purged)
    }

    async fn write_meta(&self, meta: &FileMeta) -> Result<()> {
        let json = serde_json::to_vec(meta)?;
        self.store.put(&meta_path(&meta.uuid), json.into()).await?;
        Ok(())
    }
}

fn data_path(uuid: &Uuid) -> StoragePath {
    StoragePath::from(format!("files/{}", uuid))
}

fn meta_path(uuid: &Uuid) -> StoragePath {
    StoragePath::from(format!("meta/{}.json", uuid))
}

fn not_found(error: object_store::Error, uuid: &Uuid) -> StorageError {
    match error {
        object_store::Error::NotFound { .. } => StorageError::NotFound(uuid.to_string()),
        other => other.into(),
    }
}

/// UUID of a file from its URL: the last path segment up to the first dot.
///
/// `https://example.org/files/{uuid}.pdf` gives `{uuid}`. The segment must
/// carry an extension.
pub fn file_uuid_from_url(url: &str) -> Option<Uuid> {
    let (_, segment) = url.rsplit_once('/')?;
    let (stem, extension) = segment.split_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Uuid::parse_str(stem).ok()
}
