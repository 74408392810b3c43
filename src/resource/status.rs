use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MESSAGE_PUBLISHED: &str = "Document publicly available.";
pub const MESSAGE_PENDING: &str = "Document pending review by editorial team.";
pub const MESSAGE_NOT_PUBLIC: &str = "Document not publicly available.";

/// Submission status of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    /// Accepted by the POST API, not processed yet
    Queued,
    /// Awaiting editorial review
    #[default]
    Pending,
    Published,
    Unpublished,
    Refused,
    /// Submission failed, only changed by a new submission
    Error,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Queued => "queued",
            ResourceStatus::Pending => "pending",
            ResourceStatus::Published => "published",
            ResourceStatus::Unpublished => "unpublished",
            ResourceStatus::Refused => "refused",
            ResourceStatus::Error => "error",
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(ResourceStatus::Queued),
            "pending" => Ok(ResourceStatus::Pending),
            "published" => Ok(ResourceStatus::Published),
            "unpublished" => Ok(ResourceStatus::Unpublished),
            "refused" => Ok(ResourceStatus::Refused),
            "error" => Ok(ResourceStatus::Error),
            other => Err(format!("Unknown resource status: {}", other)),
        }
    }
}

/// Status change computed by [`reconcile`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub status: ResourceStatus,
    pub message: String,
}

/// Next status of a resource after the POST API pinged it.
///
/// `has_public_data` tells whether the read API exposes the document.
/// Returns `None` when the status stays the same.
pub fn reconcile(
    current: ResourceStatus,
    has_public_data: bool,
    embargoed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Transition> {
    let (status, message) = if has_public_data {
        (ResourceStatus::Published, MESSAGE_PUBLISHED.to_string())
    } else {
        match current {
            // Errors need a new submission, published documents never go back
            ResourceStatus::Error | ResourceStatus::Published => return None,
            ResourceStatus::Queued => (ResourceStatus::Pending, MESSAGE_PENDING.to_string()),
            _ => {
                let message = match embargoed_at {
                    Some(embargoed_at) if embargoed_at < now => format!(
                        "Document embargoed until {}.",
                        embargoed_at.to_rfc3339_opts(SecondsFormat::Secs, false)
                    ),
                    _ => MESSAGE_NOT_PUBLIC.to_string(),
                };
                (ResourceStatus::Unpublished, message)
            }
        }
    };

    (status != current).then_some(Transition { status, message })
}
