//! ReliefWeb API client
//!
//! Read queries go through [`ReliefWebApiClient::request_multiple`]: payloads
//! are sanitized and fingerprinted, cached bodies are served directly and
//! every remaining request is dispatched concurrently. Read paths never
//! fail; a failed request resolves to an empty body and an undecodable one
//! to [`ResponseData::Null`].
//!
//! Submissions ([`ReliefWebApiClient::submit_content`]) and schema fetches
//! are single requests that surface their errors.

pub mod error;
pub mod transport;
mod urls;

pub use error::{ClientError, Result, TransportError};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use urls::{DEFAULT_URL_REPLACEMENT, update_api_urls};

use futures::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::cache::{CacheBackend, CacheValue, Expiration};
use crate::config::Config;
use crate::observability::Metrics;
use crate::query::encode::{fingerprint, query_pairs};
use crate::query::{HeadersMap, Method, Query, QueryPayload};
use crate::schema::JsonSchema;

/// Namespace of the resource UUIDs derived from submission URLs
pub const NAMESPACE_UUID: Uuid = Uuid::from_u128(0x8e27a998_c362_5d1f_b152_d474e1d36af2);

pub const API_KEY_HEADER: &str = "X-RW-POST-API-KEY";
pub const PROVIDER_HEADER: &str = "X-RW-POST-API-PROVIDER";

/// Client settings extracted from the configuration
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_url: String,
    pub appname: String,
    pub website: String,
    pub cache_enabled: bool,
    pub cache_lifetime: Duration,
    pub cache_namespace: String,
    pub resource_tags: HashMap<String, Vec<String>>,
    pub schema_url: Option<String>,
    /// Timeout of read requests made without an explicit one
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.api.url.clone(),
            appname: config.api.appname.clone(),
            website: config.api.website.clone(),
            cache_enabled: config.cache.enabled,
            cache_lifetime: config.cache.lifetime.as_duration(),
            cache_namespace: config.cache.namespace.clone(),
            resource_tags: config.cache.resource_tags.clone(),
            schema_url: config.post_api.schema_url.clone(),
            timeout: config.api.timeout.as_duration(),
        }
    }
}

/// Per-call options of the read paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub decode: bool,
    /// Falls back to [`ClientSettings::timeout`]
    pub timeout: Option<Duration>,
    pub cache_enabled: bool,
    /// Skip the cache lookup but store the fresh response
    pub refresh: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            decode: true,
            timeout: None,
            cache_enabled: true,
            refresh: false,
        }
    }
}

impl RequestOptions {
    pub fn raw() -> Self {
        Self {
            decode: false,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn refreshed(mut self) -> Self {
        self.refresh = true;
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }
}

/// Result of one read query
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseData {
    /// Not sent, or the body could not be decoded
    Null,
    /// Undecoded body, empty when the request failed
    Raw(String),
    Json(Value),
}

impl ResponseData {
    pub fn is_null(&self) -> bool {
        matches!(self, ResponseData::Null)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }
}

struct PendingRequest {
    key: String,
    resource: String,
    cache_id: Option<String>,
    request: HttpRequest,
}

/// Client for the ReliefWeb read and POST APIs
#[derive(Clone)]
pub struct ReliefWebApiClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<dyn CacheBackend>,
    settings: Arc<ClientSettings>,
    metrics: Arc<Metrics>,
}

impl ReliefWebApiClient {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<dyn CacheBackend>,
        settings: ClientSettings,
    ) -> Self {
        Self {
            transport,
            cache,
            settings: Arc::new(settings),
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Flush the response cache to durable storage
    pub fn flush_cache(&self) {
        if let Err(e) = self.cache.flush() {
            warn!(error = %e, "Unable to flush the response cache");
        }
    }

    /// Point the URLs of API data at the public website
    pub fn rewrite_api_urls(&self, data: &mut Value) {
        update_api_urls(data, &self.settings.website, true);
    }

    /// Cache id of a query: `{namespace}:queries:{resource}:{method}:{fingerprint}`
    pub fn cache_id(&self, resource: &str, method: Method, fingerprint: &str) -> String {
        format!(
            "{}:queries:{}:{}:{}",
            self.settings.cache_namespace, resource, method, fingerprint
        )
    }

    /// Configured extra tags of a resource plus `{namespace}:{resource}`
    pub fn cache_tags(&self, resource: &str) -> Vec<String> {
        let mut tags = self
            .settings
            .resource_tags
            .get(resource)
            .cloned()
            .unwrap_or_default();
        tags.push(format!("{}:{}", self.settings.cache_namespace, resource));
        tags
    }

    /// Execute a batch of queries, keyed by caller-chosen names.
    ///
    /// Every key of `queries` is present in the result.
    pub async fn request_multiple(
        &self,
        queries: BTreeMap<String, Query>,
        options: RequestOptions,
    ) -> BTreeMap<String, ResponseData> {
        let use_cache = options.cache_enabled && self.settings.cache_enabled;
        let timeout = options.timeout.unwrap_or(self.settings.timeout);
        let mut raw: BTreeMap<String, Option<String>> = BTreeMap::new();
        let mut pending = Vec::new();

        for (key, query) in queries {
            let Query {
                resource,
                method,
                payload,
                headers,
            } = query;
            let payload = payload.sanitized();

            let cache_id = if use_cache {
                match fingerprint(&payload) {
                    Ok(hash) => Some(self.cache_id(&resource, method, &hash)),
                    Err(e) => {
                        warn!(resource = %resource, error = %e, "Unable to fingerprint payload");
                        raw.insert(key, None);
                        continue;
                    }
                }
            } else {
                None
            };

            if let Some(id) = cache_id.as_ref().filter(|_| !options.refresh) {
                if let Some(body) = self.cached_text(id) {
                    raw.insert(key, Some(body));
                    continue;
                }
            }

            match self.build_request(&resource, method, &payload, headers, timeout) {
                Ok(request) => pending.push(PendingRequest {
                    key,
                    resource,
                    cache_id,
                    request,
                }),
                Err(e) => {
                    warn!(resource = %resource, error = %e, "Unable to build API request");
                    raw.insert(key, None);
                }
            }
        }

        let bodies = join_all(pending.iter().map(|p| self.dispatch(&p.request))).await;

        for (pending, body) in pending.into_iter().zip(bodies) {
            if let Some(id) = &pending.cache_id {
                let expiration = Expiration::after_secs(self.settings.cache_lifetime.as_secs());
                let tags = self.cache_tags(&pending.resource);
                if let Err(e) = self
                    .cache
                    .set(id, CacheValue::Text(body.clone()), expiration, &tags)
                {
                    warn!(cache_id = %id, error = %e, "Unable to cache API response");
                }
            }
            raw.insert(pending.key, Some(body));
        }

        raw.into_iter()
            .map(|(key, body)| {
                let data = match body {
                    None => ResponseData::Null,
                    Some(body) if options.decode && !body.is_empty() => {
                        match serde_json::from_str(&body) {
                            Ok(value) => ResponseData::Json(value),
                            Err(e) => {
                                warn!(key = %key, error = %e, "Unable to decode API response");
                                ResponseData::Null
                            }
                        }
                    }
                    Some(body) => ResponseData::Raw(body),
                };
                (key, data)
            })
            .collect()
    }

    /// Single query, keyed by its resource
    pub async fn request(
        &self,
        method: Method,
        resource: &str,
        payload: impl Into<QueryPayload>,
        headers: HeadersMap,
        options: RequestOptions,
    ) -> ResponseData {
        let query = Query::builder()
            .resource(resource)
            .method(method)
            .payload(payload)
            .headers(headers)
            .build();

        let mut results = self
            .request_multiple(BTreeMap::from([(resource.to_string(), query)]), options)
            .await;
        results.remove(resource).unwrap_or(ResponseData::Null)
    }

    /// Push a document to the POST API with a single PUT.
    ///
    /// `resource` includes the document id, e.g. `reports/{uuid}`. The
    /// provider and API key headers are required.
    pub async fn submit_content(
        &self,
        resource: &str,
        payload: &Value,
        headers: &HeadersMap,
        timeout: Duration,
    ) -> Result<Value> {
        if headers.get(API_KEY_HEADER).is_none_or(|v| v.is_empty()) {
            return Err(ClientError::MissingApiKey);
        }
        if headers.get(PROVIDER_HEADER).is_none_or(|v| v.is_empty()) {
            return Err(ClientError::MissingProvider);
        }

        let result = self.put_content(resource, payload, headers, timeout).await;
        match &result {
            Ok(_) => {
                self.metrics.submission_accepted();
                info!(resource, "Content submitted");
            }
            Err(e) => {
                self.metrics.submission_failed();
                warn!(resource, error = %e, "Content submission failed");
            }
        }
        result
    }

    async fn put_content(
        &self,
        resource: &str,
        payload: &Value,
        headers: &HeadersMap,
        timeout: Duration,
    ) -> Result<Value> {
        let url = self.api_url(resource)?;
        let request_headers = json_headers(headers.clone());

        let request = HttpRequest {
            method: Method::Put,
            url: url.to_string(),
            headers: request_headers,
            body: Some(serde_json::to_string(payload)?),
            timeout,
        };

        self.metrics.request_dispatched();
        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| TransportError::Timeout)??;

        if response.status != 200 {
            return Err(ClientError::Rejected {
                status: response.status,
                body: response.body,
            });
        }

        serde_json::from_str(&response.body).map_err(ClientError::InvalidResponse)
    }

    /// Fetch the POST API JSON schema of a document type.
    ///
    /// Schemas are cached permanently. `Ok(None)` means the schema could not
    /// be retrieved this time.
    pub async fn get_post_api_json_schema(&self, kind: &str) -> Result<Option<JsonSchema>> {
        let base = self
            .settings
            .schema_url
            .as_deref()
            .ok_or(ClientError::MissingSchemaUrl)?;

        let cache_id = format!("{}:post_api:schema:{}", self.settings.cache_namespace, kind);
        match self.cache.get(&cache_id) {
            Ok(Some(CacheValue::Schema(schema))) => {
                self.metrics.cache_hit();
                return Ok(Some(schema));
            }
            Ok(_) => self.metrics.cache_miss(),
            Err(e) => warn!(cache_id = %cache_id, error = %e, "Cache lookup failed"),
        }

        let url = format!("{}/{}.json", base.trim_end_matches('/'), kind);
        let request = HttpRequest {
            method: Method::Get,
            url: url.clone(),
            headers: HeadersMap::new(),
            body: None,
            timeout: self.settings.timeout,
        };

        let body = self.dispatch(&request).await;
        if body.is_empty() {
            return Ok(None);
        }

        let Some(schema) = JsonSchema::parse(body) else {
            warn!(url = %url, "Unable to decode JSON schema");
            return Ok(None);
        };

        if let Err(e) = self.cache.set(
            &cache_id,
            CacheValue::Schema(schema.clone()),
            Expiration::Permanent,
            &[],
        ) {
            warn!(cache_id = %cache_id, error = %e, "Unable to cache JSON schema");
        }

        Ok(Some(schema))
    }

    fn cached_text(&self, id: &str) -> Option<String> {
        match self.cache.get(id) {
            Ok(Some(CacheValue::Text(body))) => {
                self.metrics.cache_hit();
                debug!(cache_id = id, "Cache hit");
                Some(body)
            }
            Ok(_) => {
                self.metrics.cache_miss();
                None
            }
            Err(e) => {
                self.metrics.cache_miss();
                warn!(cache_id = id, error = %e, "Cache lookup failed");
                None
            }
        }
    }

    /// `{api_url}/{resource}?appname={appname}`
    fn api_url(&self, resource: &str) -> Result<Url> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            resource.trim_start_matches('/')
        ))?;
        url.query_pairs_mut()
            .append_pair("appname", &self.settings.appname);
        Ok(url)
    }

    fn build_request(
        &self,
        resource: &str,
        method: Method,
        payload: &QueryPayload,
        headers: HeadersMap,
        timeout: Duration,
    ) -> Result<HttpRequest> {
        let mut url = self.api_url(resource)?;

        let (body, headers) = if method.has_body() {
            let body = match payload {
                QueryPayload::Structured(payload) => serde_json::to_string(payload)?,
                QueryPayload::Raw(raw) => raw.clone(),
            };
            (Some(body), json_headers(headers))
        } else {
            match payload {
                QueryPayload::Structured(payload) => {
                    let value = serde_json::to_value(payload)?;
                    let mut pairs = url.query_pairs_mut();
                    for (name, value) in query_pairs(&value) {
                        pairs.append_pair(&name, &value);
                    }
                }
                QueryPayload::Raw(raw) => {
                    let raw = raw.trim_start_matches(['?', '&']);
                    if !raw.is_empty() {
                        let query = format!("{}&{}", url.query().unwrap_or_default(), raw);
                        url.set_query(Some(&query));
                    }
                }
            }
            (None, headers)
        };

        Ok(HttpRequest {
            method,
            url: url.to_string(),
            headers,
            body,
            timeout,
        })
    }

    /// Send one request, resolving every failure to an empty body
    async fn dispatch(&self, request: &HttpRequest) -> String {
        self.metrics.request_dispatched();

        let outcome = tokio::time::timeout(request.timeout, self.transport.send(request.clone())).await;
        match outcome {
            Ok(Ok(response)) if response.status == 200 => response.body,
            Ok(Ok(response)) => {
                self.metrics.request_failed();
                warn!(url = %request.url, status = response.status, "Unexpected API response status");
                String::new()
            }
            Ok(Err(e)) => {
                self.metrics.request_failed();
                warn!(url = %request.url, error = %e, "API request failed");
                String::new()
            }
            Err(_) => {
                self.metrics.request_failed();
                warn!(url = %request.url, timeout = ?request.timeout, "API request timed out");
                String::new()
            }
        }
    }
}

/// Caller headers with the JSON content type enforced
fn json_headers(mut headers: HeadersMap) -> HeadersMap {
    headers.retain(|name, _| !name.eq_ignore_ascii_case("content-type"));
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers
}
