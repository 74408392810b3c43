use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::observability::MetricsSnapshot;
use crate::resource::{ResourceKind, ResourceRecord, ResourceStatus};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub metrics: MetricsSnapshot,
}

/// Public view of a resource record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSnapshot {
    pub id: Uuid,
    pub resource_uuid: Option<Uuid>,
    pub kind: ResourceKind,
    pub status: ResourceStatus,
    pub message: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub changed_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub embargoed_at: Option<DateTime<Utc>>,
}

impl From<&ResourceRecord> for ResourceSnapshot {
    fn from(record: &ResourceRecord) -> Self {
        Self {
            id: record.id,
            resource_uuid: record.stored_resource_uuid(),
            kind: record.kind,
            status: record.status(),
            message: record.message().to_string(),
            created_at: record.created_at,
            changed_at: record.changed_at,
            embargoed_at: record.embargoed_at,
        }
    }
}
