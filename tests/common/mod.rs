#![allow(dead_code)]

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tempfile::TempDir;

use reliefweb_sync::cache::{CacheBackend, MemoryCache};
use reliefweb_sync::client::{ClientSettings, ReliefWebApiClient, ReqwestTransport};
use reliefweb_sync::config::ApiConfig;
use reliefweb_sync::resource::{FjallResourceStore, ResourceManager, ResourceSettings};
use reliefweb_sync::storage::AttachmentStore;

pub const API_KEY: &str = "secret-key";
pub const PROVIDER: &str = "provider-42";
pub const SUBMISSION_BASE_URL: &str = "https://partner.example.org/node";

/// Fake ReliefWeb API: read endpoints, POST API and schemas
#[derive(Clone, Default)]
pub struct MockApi {
    /// Published documents by resource UUID, as read API fields
    pub published: Arc<RwLock<HashMap<String, Value>>>,
    /// Bodies received by the POST API, by resource UUID
    pub submissions: Arc<RwLock<HashMap<String, Value>>>,
    pub hits: Arc<AtomicUsize>,
}

impl MockApi {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn publish(&self, resource_uuid: &str, fields: Value) {
        self.published
            .write()
            .unwrap()
            .insert(resource_uuid.to_string(), fields);
    }

    pub fn submission(&self, resource_uuid: &str) -> Option<Value> {
        self.submissions.read().unwrap().get(resource_uuid).cloned()
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

async fn search_reports(State(api): State<MockApi>) -> Json<Value> {
    api.hit();
    Json(json!({
        "totalCount": 1,
        "data": [{"id": "1", "fields": {"id": 1, "title": "Flash Update"}}]
    }))
}

async fn get_report(State(api): State<MockApi>, Path(uuid): Path<String>) -> impl IntoResponse {
    api.hit();
    match api.published.read().unwrap().get(&uuid) {
        Some(fields) => (
            StatusCode::OK,
            Json(json!({"data": [{"id": "1", "fields": fields}]})),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn put_report(
    State(api): State<MockApi>,
    Path(uuid): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    api.hit();
    let key = headers.get("X-RW-POST-API-KEY").and_then(|v| v.to_str().ok());
    let provider = headers
        .get("X-RW-POST-API-PROVIDER")
        .and_then(|v| v.to_str().ok());
    if key != Some(API_KEY) || provider != Some(PROVIDER) {
        return (StatusCode::UNAUTHORIZED, "Invalid API key".to_string()).into_response();
    }
    api.submissions.write().unwrap().insert(uuid, body);
    (StatusCode::OK, Json(json!("Document queued for processing."))).into_response()
}

async fn countries(State(api): State<MockApi>) -> Json<Value> {
    api.hit();
    Json(json!({
        "data": [
            {"id": "13", "fields": {"id": 13, "name": "Chad", "iso3": "tcd", "shortname": "Chad"}},
            {"id": "34", "fields": {"id": 34, "name": "Cameroon", "iso3": "cmr", "shortname": "Cameroon"}}
        ]
    }))
}

async fn slow(State(api): State<MockApi>) -> Json<Value> {
    api.hit();
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({"data": []}))
}

async fn broken(State(api): State<MockApi>) -> impl IntoResponse {
    api.hit();
    (StatusCode::INTERNAL_SERVER_ERROR, "upstream failure")
}

async fn report_schema(State(api): State<MockApi>) -> Json<Value> {
    api.hit();
    Json(json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["title"],
        "properties": {"title": {"type": "string", "minLength": 10}}
    }))
}

/// Start the mock API on an ephemeral port, returns its base URL
pub async fn start_mock_api(api: MockApi) -> String {
    let app = Router::new()
        .route("/v1/reports", post(search_reports).get(search_reports))
        .route("/v1/reports/{uuid}", get(get_report).put(put_report))
        .route("/v1/countries", get(countries))
        .route("/v1/slow", get(slow))
        .route("/v1/broken", get(broken))
        .route("/schemas/report.json", get(report_schema))
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

pub fn client_settings(base_url: &str) -> ClientSettings {
    ClientSettings {
        api_url: format!("{}/v1", base_url),
        appname: "reliefweb-sync-tests".to_string(),
        website: "https://reliefweb.int".to_string(),
        cache_enabled: true,
        cache_lifetime: Duration::from_secs(300),
        cache_namespace: "test:api".to_string(),
        resource_tags: HashMap::new(),
        schema_url: Some(format!("{}/schemas", base_url)),
        timeout: Duration::from_secs(5),
    }
}

pub fn build_client(base_url: &str, cache: Arc<dyn CacheBackend>) -> ReliefWebApiClient {
    build_client_with(client_settings(base_url), cache)
}

pub fn build_client_with(settings: ClientSettings, cache: Arc<dyn CacheBackend>) -> ReliefWebApiClient {
    let transport = ReqwestTransport::new(&ApiConfig::default()).unwrap();
    ReliefWebApiClient::new(Arc::new(transport), cache, settings)
}

pub fn resource_settings() -> ResourceSettings {
    ResourceSettings {
        submission_base_url: Some(SUBMISSION_BASE_URL.to_string()),
        provider_id: Some(PROVIDER.to_string()),
        api_key: Some(API_KEY.to_string()),
        public_url: "http://localhost:8080".to_string(),
        submit_timeout: Duration::from_secs(2),
    }
}

/// Resource manager wired to the mock API with an on-disk store
pub fn build_manager(
    base_url: &str,
    settings: ResourceSettings,
) -> (ResourceManager, TempDir) {
    build_manager_with(
        client_settings(base_url),
        settings,
        AttachmentStore::in_memory(),
    )
}

pub fn build_manager_with(
    client_settings: ClientSettings,
    settings: ResourceSettings,
    attachments: AttachmentStore,
) -> (ResourceManager, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = FjallResourceStore::open(temp_dir.path().join("resources"))
        .expect("Failed to open resource store");
    let client = build_client_with(client_settings, Arc::new(MemoryCache::new()));

    let manager = ResourceManager::new(client, Arc::new(store), attachments, settings);
    (manager, temp_dir)
}
