mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use bytes::Bytes;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`
use uuid::Uuid;

use reliefweb_sync::api::{AppState, router};
use reliefweb_sync::config::Config;
use reliefweb_sync::resource::{ResourceKind, ResourceManager, ResourceRecord};

use common::{MockApi, build_manager, resource_settings, start_mock_api};

async fn build_test_app() -> (Router, ResourceManager, MockApi, TempDir) {
    let api = MockApi::default();
    let base_url = start_mock_api(api.clone()).await;
    let (manager, temp_dir) = build_manager(&base_url, resource_settings());

    let state = AppState::new(Config::default(), manager.clone());
    (router(state), manager, api, temp_dir)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn submitted_record(manager: &ResourceManager) -> Uuid {
    let content = json!({"title": "Sudan: Displacement update"});
    let mut record =
        ResourceRecord::new(ResourceKind::Report).with_content(content.as_object().cloned().unwrap());
    record.set_submit_content(true);
    manager.save(&mut record).await.unwrap();
    record.stored_resource_uuid().unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _, _, _dir) = build_test_app().await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["metrics"]["requests_dispatched"].is_u64());
}

#[tokio::test]
async fn test_webhook_unknown_resource() {
    let (app, _, _, _dir) = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/reliefweb/webhook/{}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_webhook_invalid_uuid() {
    let (app, _, _, _dir) = build_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reliefweb/webhook/not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_updates_status() {
    let (app, manager, api, _dir) = build_test_app().await;
    let resource_uuid = submitted_record(&manager).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/reliefweb/webhook/{}", resource_uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["changed"], true);

    api.publish(&resource_uuid.to_string(), json!({"id": 1, "title": "Sudan"}));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/reliefweb/webhook/{}", resource_uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "published");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/reliefweb/resources/{}", resource_uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "published");
    assert_eq!(body["kind"], "report");
    assert_eq!(body["resource_uuid"], resource_uuid.to_string());
}

#[tokio::test]
async fn test_list_resources() {
    let (app, manager, _, _dir) = build_test_app().await;

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/reliefweb/resources").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));

    let resource_uuid = submitted_record(&manager).await;

    let response = app
        .oneshot(Request::builder().uri("/reliefweb/resources").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["status"], "queued");
    assert_eq!(items[0]["resource_uuid"], resource_uuid.to_string());
}

#[tokio::test]
async fn test_file_preview() {
    let (app, manager, _, _dir) = build_test_app().await;
    let meta = manager
        .attachments()
        .upload("map.png", Some("image/png"), Bytes::from_static(b"\x89PNG"))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/reliefweb/files/{}.png", meta.uuid))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "inline; filename=\"map.png\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"\x89PNG");

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/reliefweb/files/{}.png", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
