use std::path::Path;

use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::Result;
use super::record::ResourceRecord;

/// Persistence of resource records
pub trait ResourceStore: Send + Sync {
    fn get(&self, id: &Uuid) -> Result<Option<ResourceRecord>>;

    /// Look a record up by its ReliefWeb resource UUID
    fn find_by_resource_uuid(&self, resource_uuid: &Uuid) -> Result<Option<ResourceRecord>>;

    fn upsert(&self, record: &ResourceRecord) -> Result<()>;

    fn delete(&self, id: &Uuid) -> Result<()>;

    fn list(&self) -> Result<Vec<ResourceRecord>>;

    /// Make pending writes durable
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Key layout:
/// - `resources`: res:{id} -> ResourceRecord (JSON)
/// - `resource_index`: rw:{resource_uuid} -> id
fn encode_record_key(id: &Uuid) -> Vec<u8> {
    format!("res:{}", id).into_bytes()
}

fn encode_index_key(resource_uuid: &Uuid) -> Vec<u8> {
    format!("rw:{}", resource_uuid).into_bytes()
}

/// Fjall-backed resource store
#[derive(Clone)]
pub struct FjallResourceStore {
    keyspace: Keyspace,
    records: PartitionHandle,
    index: PartitionHandle,
}

impl FjallResourceStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening resource store at: {}", path.display());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let keyspace = Config::new(path).open()?;
        let records = keyspace.open_partition("resources", PartitionCreateOptions::default())?;
        let index = keyspace.open_partition("resource_index", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            records,
            index,
        })
    }
}

impl ResourceStore for FjallResourceStore {
    fn get(&self, id: &Uuid) -> Result<Option<ResourceRecord>> {
        match self.records.get(encode_record_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    fn find_by_resource_uuid(&self, resource_uuid: &Uuid) -> Result<Option<ResourceRecord>> {
        let Some(value) = self.index.get(encode_index_key(resource_uuid))? else {
            return Ok(None);
        };
        match Uuid::from_slice(&value) {
            Ok(id) => self.get(&id),
            Err(_) => Ok(None),
        }
    }

    fn upsert(&self, record: &ResourceRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.records.insert(encode_record_key(&record.id), value)?;
        if let Some(resource_uuid) = record.stored_resource_uuid() {
            self.index
                .insert(encode_index_key(&resource_uuid), record.id.as_bytes().to_vec())?;
        }
        debug!(id = %record.id, status = %record.status(), "Upserted resource");
        Ok(())
    }

    fn delete(&self, id: &Uuid) -> Result<()> {
        if let Some(record) = self.get(id)? {
            if let Some(resource_uuid) = record.stored_resource_uuid() {
                self.index.remove(encode_index_key(&resource_uuid))?;
            }
        }
        self.records.remove(encode_record_key(id))?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<ResourceRecord>> {
        let mut records = Vec::new();
        for item in self.records.iter() {
            let (_, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    fn flush(&self) -> Result<()> {
        self.keyspace.persist(fjall::PersistMode::SyncAll)?;
        Ok(())
    }
}
