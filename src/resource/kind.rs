use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use super::report;
use crate::client::ReliefWebApiClient;
use crate::storage::AttachmentStore;

/// Collaborators needed to turn submitted content into API data
pub struct MappingContext<'a> {
    pub client: &'a ReliefWebApiClient,
    pub attachments: &'a AttachmentStore,
    /// Base URL of the file previews
    pub public_url: &'a str,
}

/// Record fields used by the mappings
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    pub resource_url: &'a str,
    pub resource_uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

/// Kind of ReliefWeb document handled by a resource record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Report,
}

impl ResourceKind {
    /// API resource, e.g. `reports`
    pub fn api_resource(&self) -> &'static str {
        match self {
            ResourceKind::Report => "reports",
        }
    }

    /// POST API schema name
    pub fn schema_type(&self) -> &'static str {
        match self {
            ResourceKind::Report => "report",
        }
    }

    /// Shape submitted content as the read API would return it
    pub async fn submitted_content_to_api_data(
        &self,
        context: &MappingContext<'_>,
        record: RecordRef<'_>,
        content: &Map<String, Value>,
    ) -> Map<String, Value> {
        match self {
            ResourceKind::Report => report::submitted_content_to_api_data(context, record, content).await,
        }
    }

    /// Rebuild submitted content from read API data
    pub fn api_data_to_submitted_content(
        &self,
        record: RecordRef<'_>,
        data: &Map<String, Value>,
    ) -> Map<String, Value> {
        match self {
            ResourceKind::Report => report::api_data_to_submitted_content(record, data),
        }
    }

    /// UUIDs of the files referenced by submitted content
    pub fn attached_files(&self, content: &Map<String, Value>) -> Vec<Uuid> {
        match self {
            ResourceKind::Report => report::attached_files(content),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_type())
    }
}
