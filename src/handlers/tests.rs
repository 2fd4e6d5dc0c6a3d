//! # Tests for Handlers
//!
//! Router-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::alerts::{
    ConfigurationStore, MemoryBackingStore, OverrideManager, StaticEntityGraph,
};
use crate::config::{AppConfig, StorageBackend};
use crate::models::ServiceInfo;
use crate::server::{AppState, create_app};

fn test_app() -> (Router, Arc<MemoryBackingStore>) {
    let backing = Arc::new(MemoryBackingStore::new());
    let store = Arc::new(ConfigurationStore::new(backing.clone()));
    let graph = StaticEntityGraph::new()
        .with_asset("AST-1", "SITE-A")
        .with_job("JOB-1", ["AST-1"], None);
    let config = AppConfig {
        storage_backend: StorageBackend::Memory,
        default_user_id: "u-default".to_string(),
        ..AppConfig::default()
    };
    let state = AppState {
        manager: OverrideManager::new(store, Arc::new(graph), config.default_user_id.clone()),
        config: Arc::new(config),
        db: None,
    };
    (create_app(state), backing)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn battery_body(low: f64, critical: f64) -> Value {
    json!({
        "enabled": true,
        "severity": "high",
        "auto_escalate": false,
        "escalation_delay_minutes": 30,
        "fields": {
            "lowBatteryThreshold": {"type": "percentage", "value": low},
            "criticalBatteryThreshold": {"type": "percentage", "value": critical},
            "checkInterval": {"type": "duration", "value": 60},
            "notifyWhileCharging": {"type": "toggle", "value": false}
        }
    })
}

fn put(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .header("X-User-Id", "u-7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_root_handler_returns_service_info() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["service"], "alert-config");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_service_info_default() {
    let service_info = ServiceInfo::default();
    assert_eq!(service_info.service, "alert-config");
}

#[tokio::test]
async fn test_healthz_reports_store_size() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["records"], 0);
}

#[tokio::test]
async fn test_list_alert_types_in_catalog_order() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/api/v1/alert-types")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let types: Vec<&str> = body["alert_types"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["alert_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec![
            "theft",
            "battery",
            "compliance",
            "underutilized",
            "offline",
            "unauthorized-zone",
            "predictive-maintenance"
        ]
    );
}

#[tokio::test]
async fn test_schema_endpoint_and_unknown_type() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(get("/api/v1/alert-types/battery/schema"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["fields"][0]["key"], "lowBatteryThreshold");

    let response = app
        .oneshot(get("/api/v1/alert-types/meteor/schema"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_validate_endpoint_reports_field_errors() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/alert-types/battery/validate")
        .header("content-type", "application/json")
        .body(Body::from(battery_body(150.0, 10.0).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert_eq!(
        body["errors"]["lowBatteryThreshold"],
        "Low Battery Threshold must be at most 50 %"
    );
}

#[tokio::test]
async fn test_get_effective_defaults_when_nothing_saved() {
    let (app, _) = test_app();
    let response = app
        .oneshot(get("/api/v1/alert-configs/job/JOB-1/battery"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "none");
    assert!(body["effective"]["source"].is_null());
    let chain: Vec<&str> = body["lookup_chain"]
        .as_array()
        .unwrap()
        .iter()
        .map(|scope| scope["level"].as_str().unwrap())
        .collect();
    assert_eq!(chain, vec!["job", "asset", "site", "user"]);
    assert_eq!(body["lookup_chain"][3]["entity_id"], "u-default");
}

#[tokio::test]
async fn test_save_then_inherit_then_delete() {
    let (app, backing) = test_app();

    let response = app
        .clone()
        .oneshot(put(
            "/api/v1/alert-configs/site/SITE-A/battery",
            &battery_body(30.0, 10.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let record = body_json(response).await;
    assert_eq!(record["is_override"], true);
    assert_eq!(record["created_by"], "u-7");
    assert!(backing.persisted().contains_key("site-SITE-A-battery"));

    let response = app
        .clone()
        .oneshot(get("/api/v1/alert-configs/asset/AST-1/battery"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "inherited");
    assert_eq!(body["effective"]["source"]["level"], "site");
    assert_eq!(
        body["effective"]["config"]["fields"]["lowBatteryThreshold"]["value"],
        30.0
    );

    let response = app
        .clone()
        .oneshot(get("/api/v1/alert-configs/site/SITE-A"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["records"].as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/alert-configs/site/SITE-A/battery")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["removed"], true);
    assert_eq!(body["status"], "none");
}

#[tokio::test]
async fn test_alert_type_configs_span_scopes_broadest_first() {
    let (app, _) = test_app();
    for uri in [
        "/api/v1/alert-configs/asset/AST-1/battery",
        "/api/v1/alert-configs/site/SITE-A/battery",
    ] {
        let response = app
            .clone()
            .oneshot(put(uri, &battery_body(30.0, 10.0)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(get("/api/v1/alert-types/battery/configs"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["alert_type"], "battery");
    let levels: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["level"].as_str().unwrap())
        .collect();
    assert_eq!(levels, vec!["site", "asset"]);

    let response = app
        .oneshot(get("/api/v1/alert-types/theft/configs"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["records"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_save_returns_field_map() {
    let (app, backing) = test_app();
    let response = app
        .oneshot(put(
            "/api/v1/alert-configs/asset/AST-1/battery",
            &battery_body(150.0, 10.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(
        body["details"]["lowBatteryThreshold"],
        "Low Battery Threshold must be at most 50 %"
    );
    assert_eq!(backing.persist_calls(), 0);
}

#[tokio::test]
async fn test_delete_user_level_is_conflict() {
    let (app, _) = test_app();
    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/alert-configs/user/u-7/battery")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = body_json(response).await;
    assert_eq!(body["code"], "INVALID_OPERATION");
    assert_eq!(body["message"], "cannot remove the base configuration");
}

#[tokio::test]
async fn test_persistence_failure_is_service_unavailable() {
    let (app, backing) = test_app();
    backing.reject_writes(true);

    let response = app
        .clone()
        .oneshot(put(
            "/api/v1/alert-configs/site/SITE-A/battery",
            &battery_body(30.0, 10.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .oneshot(get("/api/v1/alert-configs/site/SITE-A/battery"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["status"], "none");
}

#[tokio::test]
async fn test_unknown_level_is_bad_request() {
    let (app, _) = test_app();
    let response = app
        .oneshot(get("/api/v1/alert-configs/fleet/F-1/battery"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trace_id_is_echoed() {
    let (app, _) = test_app();
    let request = Request::builder()
        .uri("/api/v1/alert-types/meteor/schema")
        .header("x-trace-id", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-trace-id").unwrap(), "trace-abc");

    let body = body_json(response).await;
    assert_eq!(body["trace_id"], "trace-abc");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = test_app();
    let response = app.oneshot(get("/api/v2/nothing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
