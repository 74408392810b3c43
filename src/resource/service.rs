use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::error::{ResourceError, Result};
use super::kind::{MappingContext, RecordRef};
use super::record::ResourceRecord;
use super::status::{ResourceStatus, reconcile};
use super::store::ResourceStore;
use crate::client::{API_KEY_HEADER, PROVIDER_HEADER, ReliefWebApiClient, RequestOptions};
use crate::config::Config;
use crate::query::{HeadersMap, Method, Payload};
use crate::schema::{self, JsonSchema};
use crate::storage::{AttachmentStore, StorageError};
use crate::terms::data_fields;

/// Submission settings extracted from the configuration
#[derive(Debug, Clone, Default)]
pub struct ResourceSettings {
    pub submission_base_url: Option<String>,
    pub provider_id: Option<String>,
    pub api_key: Option<String>,
    pub public_url: String,
    pub submit_timeout: Duration,
}

impl ResourceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            submission_base_url: config.post_api.submission_base_url.clone(),
            provider_id: config.post_api.provider_id.clone(),
            api_key: config.post_api.api_key.clone(),
            public_url: config.server.public_url.clone(),
            submit_timeout: config.api.timeout.as_duration(),
        }
    }

    fn submission_headers(&self) -> HeadersMap {
        let mut headers = HeadersMap::new();
        if let Some(provider) = &self.provider_id {
            headers.insert(PROVIDER_HEADER.to_string(), provider.clone());
        }
        if let Some(key) = &self.api_key {
            headers.insert(API_KEY_HEADER.to_string(), key.clone());
        }
        headers
    }
}

/// Status of a record after a ping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingOutcome {
    pub id: Uuid,
    pub resource_uuid: Uuid,
    pub status: ResourceStatus,
    pub message: String,
    pub changed: bool,
}

/// Lifecycle of resource records: submission, persistence, webhook pings
#[derive(Clone)]
pub struct ResourceManager {
    client: ReliefWebApiClient,
    store: Arc<dyn ResourceStore>,
    attachments: AttachmentStore,
    settings: Arc<ResourceSettings>,
}

impl ResourceManager {
    pub fn new(
        client: ReliefWebApiClient,
        store: Arc<dyn ResourceStore>,
        attachments: AttachmentStore,
        settings: ResourceSettings,
    ) -> Self {
        Self {
            client,
            store,
            attachments,
            settings: Arc::new(settings),
        }
    }

    pub fn client(&self) -> &ReliefWebApiClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    fn base_url(&self) -> Option<&str> {
        self.settings.submission_base_url.as_deref()
    }

    fn record_ref(&self, record: &mut ResourceRecord) -> Result<(String, Uuid)> {
        let uuid = record.resource_uuid(self.base_url())?;
        let url = record.resource_url(self.base_url())?.to_string();
        Ok((url, uuid))
    }

    /// Persist a record.
    ///
    /// The resource UUID is derived first and the content is submitted when
    /// the submit flag is set. Attachments follow the resulting status.
    pub async fn save(&self, record: &mut ResourceRecord) -> Result<()> {
        record.resource_uuid(self.base_url())?;

        if record.submit_content() {
            self.submit(record).await?;
            record.set_submit_content(false);
        }

        self.persist(record)?;
        self.sync_attachments(record).await
    }

    fn persist(&self, record: &mut ResourceRecord) -> Result<()> {
        record.changed_at = Utc::now();
        self.store.upsert(record)
    }

    /// Flush the record store and the response cache
    pub fn flush(&self) -> Result<()> {
        self.client.flush_cache();
        self.store.flush()
    }

    /// Send the submitted content to the POST API, recording the outcome
    async fn submit(&self, record: &mut ResourceRecord) -> Result<()> {
        let Some(content) = record.submitted_content().cloned() else {
            return Ok(());
        };

        let resource_uuid = record.resource_uuid(self.base_url())?;
        let resource = format!("{}/{}", record.kind.api_resource(), resource_uuid);
        let headers = self.settings.submission_headers();

        match self
            .client
            .submit_content(
                &resource,
                &Value::Object(content),
                &headers,
                self.settings.submit_timeout,
            )
            .await
        {
            Ok(response) => {
                let message = match response {
                    Value::String(message) => message,
                    other => other.to_string(),
                };
                record.set_status(ResourceStatus::Queued, message);
            }
            Err(e) => {
                record.set_status(ResourceStatus::Error, e.to_string());
            }
        }

        info!(id = %record.id, status = %record.status(), "Submitted resource");
        Ok(())
    }

    /// Files of documents awaiting review are kept, others may be purged
    async fn sync_attachments(&self, record: &ResourceRecord) -> Result<()> {
        let Some(content) = record.submitted_content() else {
            return Ok(());
        };

        for uuid in record.kind.attached_files(content) {
            let result = if record.status() == ResourceStatus::Pending {
                self.attachments.set_permanent(&uuid).await
            } else {
                self.attachments.set_temporary(&uuid).await
            };
            match result {
                Ok(_) => {}
                Err(StorageError::NotFound(_)) => {
                    warn!(id = %record.id, file = %uuid, "Attachment missing");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Delete a record and its attachments
    pub async fn delete(&self, id: &Uuid) -> Result<bool> {
        let Some(record) = self.store.get(id)? else {
            return Ok(false);
        };

        if let Some(content) = record.submitted_content() {
            for uuid in record.kind.attached_files(content) {
                self.attachments.delete(&uuid).await?;
            }
        }

        self.store.delete(id)?;
        info!(id = %id, "Deleted resource");
        Ok(true)
    }

    /// Refresh the API data of a resource and update its status
    pub async fn handle_ping(&self, resource_uuid: &Uuid) -> Result<PingOutcome> {
        let mut record = self
            .store
            .find_by_resource_uuid(resource_uuid)?
            .ok_or_else(|| ResourceError::NotFound(resource_uuid.to_string()))?;

        let data = self.retrieve_api_data(&mut record, true).await?;
        let transition = reconcile(record.status(), !data.is_empty(), record.embargoed_at, Utc::now());

        let changed = transition.is_some();
        if let Some(transition) = transition {
            info!(
                resource_uuid = %resource_uuid,
                from = %record.status(),
                to = %transition.status,
                "Resource status changed"
            );
            record.set_submit_content(false);
            record.set_status(transition.status, transition.message);
            // Attachments first so a storage failure leaves the stored status untouched
            self.sync_attachments(&record).await?;
            self.persist(&mut record)?;
        }

        Ok(PingOutcome {
            id: record.id,
            resource_uuid: *resource_uuid,
            status: record.status(),
            message: record.message().to_string(),
            changed,
        })
    }

    /// Document fields as exposed by the read API, memoized on the record
    pub async fn retrieve_api_data(
        &self,
        record: &mut ResourceRecord,
        refresh: bool,
    ) -> Result<Map<String, Value>> {
        if !refresh {
            if let Some(data) = record.cached_api_data() {
                return Ok(data.clone());
            }
        }

        let resource_uuid = record.resource_uuid(self.base_url())?;
        let endpoint = format!("{}/{}", record.kind.api_resource(), resource_uuid);
        let options = if refresh {
            RequestOptions::default().refreshed()
        } else {
            RequestOptions::default()
        };

        let response = self
            .client
            .request(Method::Get, &endpoint, Payload::default(), HeadersMap::new(), options)
            .await;

        let mut data = Value::Object(
            response
                .as_json()
                .map(data_fields)
                .and_then(|items| items.into_iter().next())
                .unwrap_or_default(),
        );
        self.client.rewrite_api_urls(&mut data);
        let Value::Object(data) = data else {
            return Ok(Map::new());
        };

        record.set_api_data(data.clone());
        Ok(data)
    }

    /// Content of the document: from the API once published, otherwise as submitted
    pub async fn get_content(&self, record: &mut ResourceRecord) -> Result<Map<String, Value>> {
        if record.status() == ResourceStatus::Published {
            let data = self.retrieve_api_data(record, false).await?;
            let (url, uuid) = self.record_ref(record)?;
            let record_ref = RecordRef {
                resource_url: &url,
                resource_uuid: uuid,
                created_at: record.created_at,
                changed_at: record.changed_at,
            };
            return Ok(record.kind.api_data_to_submitted_content(record_ref, &data));
        }
        Ok(record.submitted_content().cloned().unwrap_or_default())
    }

    /// Document in the read API shape: fetched once published, otherwise
    /// mapped from the submitted content
    pub async fn get_api_data(&self, record: &mut ResourceRecord) -> Result<Map<String, Value>> {
        if record.status() == ResourceStatus::Published {
            return self.retrieve_api_data(record, false).await;
        }

        let Some(content) = record.submitted_content().cloned() else {
            return Ok(Map::new());
        };

        let (url, uuid) = self.record_ref(record)?;
        let context = MappingContext {
            client: &self.client,
            attachments: &self.attachments,
            public_url: &self.settings.public_url,
        };
        let record_ref = RecordRef {
            resource_url: &url,
            resource_uuid: uuid,
            created_at: record.created_at,
            changed_at: record.changed_at,
        };
        Ok(record
            .kind
            .submitted_content_to_api_data(&context, record_ref, &content)
            .await)
    }

    /// POST API schema of the record kind, memoized on the record
    pub async fn json_schema(&self, record: &mut ResourceRecord) -> Result<Option<JsonSchema>> {
        if let Some(schema) = record.cached_json_schema() {
            return Ok(Some(schema.clone()));
        }

        let schema = self
            .client
            .get_post_api_json_schema(record.kind.schema_type())
            .await?;
        if let Some(schema) = &schema {
            record.set_json_schema(schema.clone());
        }
        Ok(schema)
    }

    /// Validation errors of `data` against the record schema, empty when valid
    pub async fn validate_schema(&self, record: &mut ResourceRecord, data: &Value) -> Vec<String> {
        let schema = match self.json_schema(record).await {
            Ok(schema) => schema,
            Err(e) => {
                warn!(id = %record.id, error = %e, "Unable to load JSON schema");
                None
            }
        };
        schema::validate(schema.as_ref(), data)
    }
}
