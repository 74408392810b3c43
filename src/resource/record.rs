use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::{ResourceError, Result};
use super::kind::ResourceKind;
use super::status::ResourceStatus;
use crate::client::NAMESPACE_UUID;
use crate::schema::JsonSchema;

/// Local record of a document submitted to ReliefWeb
///
/// `resource_url`, `api_data` and `json_schema` are process-local and never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Local identifier
    pub id: Uuid,
    pub kind: ResourceKind,
    #[serde(default)]
    resource_uuid: Option<Uuid>,
    #[serde(default)]
    status: ResourceStatus,
    #[serde(default)]
    message: String,
    #[serde(default)]
    content: Option<Map<String, Value>>,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub embargoed_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    resource_url: Option<String>,
    #[serde(skip)]
    api_data: Option<Map<String, Value>>,
    #[serde(skip)]
    json_schema: Option<JsonSchema>,
    #[serde(skip)]
    submit_content: bool,
}

impl ResourceRecord {
    pub fn new(kind: ResourceKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            resource_uuid: None,
            status: ResourceStatus::default(),
            message: String::new(),
            content: None,
            created_at: now,
            changed_at: now,
            embargoed_at: None,
            resource_url: None,
            api_data: None,
            json_schema: None,
            submit_content: false,
        }
    }

    pub fn with_content(mut self, content: Map<String, Value>) -> Self {
        self.set_submitted_content(content);
        self
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_status(&mut self, status: ResourceStatus, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    pub fn has_submitted_content(&self) -> bool {
        self.content.as_ref().is_some_and(|content| !content.is_empty())
    }

    pub fn submitted_content(&self) -> Option<&Map<String, Value>> {
        self.content.as_ref().filter(|content| !content.is_empty())
    }

    pub fn set_submitted_content(&mut self, content: Map<String, Value>) {
        self.content = Some(content);
    }

    /// Whether the next save pushes the content to the POST API
    pub fn submit_content(&self) -> bool {
        self.submit_content
    }

    pub fn set_submit_content(&mut self, submit: bool) {
        self.submit_content = submit;
    }

    /// Unique URL of the submission, `{base_url}/{id}`
    pub fn resource_url(&mut self, base_url: Option<&str>) -> Result<&str> {
        if self.resource_url.is_none() {
            let base_url = base_url.ok_or(ResourceError::MissingSubmissionBaseUrl)?;
            self.resource_url = Some(format!("{}/{}", base_url.trim_end_matches('/'), self.id));
        }
        Ok(self.resource_url.as_deref().unwrap_or_default())
    }

    /// ReliefWeb identifier of the document, derived once from the resource URL
    pub fn resource_uuid(&mut self, base_url: Option<&str>) -> Result<Uuid> {
        if let Some(uuid) = self.resource_uuid {
            return Ok(uuid);
        }
        let url = self.resource_url(base_url)?;
        let uuid = Uuid::new_v5(&NAMESPACE_UUID, url.as_bytes());
        self.resource_uuid = Some(uuid);
        Ok(uuid)
    }

    /// Resource UUID if it was already derived
    pub fn stored_resource_uuid(&self) -> Option<Uuid> {
        self.resource_uuid
    }

    pub(crate) fn cached_api_data(&self) -> Option<&Map<String, Value>> {
        self.api_data.as_ref()
    }

    pub(crate) fn set_api_data(&mut self, data: Map<String, Value>) {
        self.api_data = Some(data);
    }

    pub(crate) fn cached_json_schema(&self) -> Option<&JsonSchema> {
        self.json_schema.as_ref()
    }

    pub(crate) fn set_json_schema(&mut self, schema: JsonSchema) {
        self.json_schema = Some(schema);
    }
}
