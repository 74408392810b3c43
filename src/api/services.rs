use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::IntoResponse,
};
use uuid::Uuid;

use super::{
    error::ApiError,
    models::{HealthResponse, ResourceSnapshot},
    state::AppState,
};
use crate::resource::PingOutcome;

fn parse_uuid(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidRequest(format!("invalid UUID: {}", raw)))
}

/// Webhook called by the POST API when a document changed
/// (POST|GET /reliefweb/webhook/{resource_uuid})
///
/// Refreshes the document from the read API and updates the local status.
pub async fn webhook(
    State(state): State<AppState>,
    Path(resource_uuid): Path<String>,
) -> Result<Json<PingOutcome>, ApiError> {
    let resource_uuid = parse_uuid(&resource_uuid)?;
    let outcome = state.resources.handle_ping(&resource_uuid).await?;
    Ok(Json(outcome))
}

/// Status of every submission (GET /reliefweb/resources)
pub async fn list_resources(
    State(state): State<AppState>,
) -> Result<Json<Vec<ResourceSnapshot>>, ApiError> {
    let records = state.resources.store().list()?;
    Ok(Json(records.iter().map(ResourceSnapshot::from).collect()))
}

/// Status of a submission (GET /reliefweb/resources/{resource_uuid})
pub async fn get_resource(
    State(state): State<AppState>,
    Path(resource_uuid): Path<String>,
) -> Result<Json<ResourceSnapshot>, ApiError> {
    let resource_uuid = parse_uuid(&resource_uuid)?;
    let record = state
        .resources
        .store()
        .find_by_resource_uuid(&resource_uuid)?
        .ok_or_else(|| ApiError::NotFound(resource_uuid.to_string()))?;
    Ok(Json(ResourceSnapshot::from(&record)))
}

/// Attachment preview (GET /reliefweb/files/{file}), `{file}` is `{uuid}.{ext}`
pub async fn preview_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let stem = file.split_once('.').map_or(file.as_str(), |(stem, _)| stem);
    let uuid = parse_uuid(stem)?;
    let (meta, bytes) = state.resources.attachments().download(&uuid).await?;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&meta.mimetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private"));

    let filename = meta.filename.replace(['"', '\\'], "_");
    if let Ok(disposition) = HeaderValue::from_str(&format!("inline; filename=\"{}\"", filename)) {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }

    Ok((headers, bytes))
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        metrics: state.metrics.snapshot(),
    })
}
