//! API query model
//!
//! A [`Query`] targets one API resource (`reports`, `countries`, ...) with
//! a method, a payload and optional extra headers. Structured payloads are
//! normalized by [`optimize`] before being sent or fingerprinted.
//!
//! ```rust,ignore
//! use reliefweb_sync::query::{Method, Payload, Query};
//!
//! let query = Query::builder()
//!     .resource("reports")
//!     .method(Method::Post)
//!     .payload(Payload::default().with("limit", 10))
//!     .build();
//! ```

pub mod encode;
pub mod filter;
pub mod optimize;

pub use filter::{Condition, Filter, FilterValue, Group, Operator, Range, Scalar};
pub use optimize::{combine_conditions, optimize_filter, sanitize_payload};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub type HeadersMap = BTreeMap<String, String>;

/// HTTP method of an API query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
        }
    }

    /// Whether the payload travels as a JSON body
    pub fn has_body(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full-text search part of a payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(str::is_empty)
    }
}

/// Facet request with its own optional filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Structured API payload
///
/// Only the parts subject to normalization are typed; everything else
/// (`fields`, `limit`, `sort`, `profile`, ...) is kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<SearchQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Payload {
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.filter.is_none() && self.facets.is_empty() && self.extra.is_empty()
    }
}

/// Query payload, either structured or a raw pre-encoded string
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPayload {
    Structured(Payload),
    /// Passed through untouched (a query string for GET, a body otherwise)
    Raw(String),
}

impl Default for QueryPayload {
    fn default() -> Self {
        QueryPayload::Structured(Payload::default())
    }
}

impl QueryPayload {
    /// Normalized copy of the payload, raw payloads are left as they are
    pub fn sanitized(self) -> Self {
        match self {
            QueryPayload::Structured(payload) => {
                QueryPayload::Structured(sanitize_payload(payload, false))
            }
            raw => raw,
        }
    }
}

impl From<Payload> for QueryPayload {
    fn from(value: Payload) -> Self {
        QueryPayload::Structured(value)
    }
}

impl From<String> for QueryPayload {
    fn from(value: String) -> Self {
        QueryPayload::Raw(value)
    }
}

impl From<&str> for QueryPayload {
    fn from(value: &str) -> Self {
        QueryPayload::Raw(value.to_string())
    }
}

/// One API query
#[derive(Debug, Clone, PartialEq, bon::Builder)]
pub struct Query {
    #[builder(into)]
    pub resource: String,
    #[builder(default)]
    pub method: Method,
    #[builder(default, into)]
    pub payload: QueryPayload,
    #[builder(default)]
    pub headers: HeadersMap,
}
