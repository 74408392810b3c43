//! Submitted resources
//!
//! A [`ResourceRecord`] mirrors a document pushed to the ReliefWeb POST API.
//! [`ResourceManager`] submits content when a record is saved and moves the
//! record through its [`ResourceStatus`] when ReliefWeb pings it back.

mod error;
mod kind;
mod record;
mod report;
mod service;
mod status;
mod store;

pub use error::{ResourceError, Result};
pub use kind::{MappingContext, RecordRef, ResourceKind};
pub use record::ResourceRecord;
pub use service::{PingOutcome, ResourceManager, ResourceSettings};
pub use status::{
    MESSAGE_NOT_PUBLIC, MESSAGE_PENDING, MESSAGE_PUBLISHED, ResourceStatus, Transition,
    reconcile,
};
pub use store::{FjallResourceStore, ResourceStore};
