#![cfg(test)]

use super::web::*;
use crate::api::{FetchError, FetchResult, ForecastDay, ForecastSource, WindowRecord};
use crate::config::Config;
use crate::entry::{ConfigEntry, Integration};
use crate::setup::EntryData;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

struct StaticSource;

#[async_trait]
impl ForecastSource for StaticSource {
    async fn fetch_window(&self, date: NaiveDate) -> FetchResult<WindowRecord> {
        Ok(WindowRecord {
            window_start_ams: format!("{}T11:00+01:00", date),
            window_end_ams: format!("{}T14:00+01:00", date),
            green_percentage: 87.5,
        })
    }

    async fn fetch_forecast(&self, _date: NaiveDate) -> FetchResult<ForecastDay> {
        Err(FetchError::Status(503))
    }
}

fn test_integration(dir: &tempfile::TempDir) -> Arc<Integration> {
    let mut config = Config::default();
    config.storage.entry_file = dir
        .path()
        .join("entry.json")
        .to_string_lossy()
        .into_owned();
    Arc::new(Integration::with_source(config, Arc::new(StaticSource)))
}

async fn running_router(dir: &tempfile::TempDir) -> (axum::Router, Arc<Integration>) {
    let integration = test_integration(dir);
    integration
        .setup(ConfigEntry::new(EntryData {
            setup_mode: None,
            day_offset: Some(2),
        }))
        .await
        .unwrap();
    let router = build_router(AppState {
        integration: integration.clone(),
    });
    (router, integration)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_ok() {
    let router = axum::Router::new().route("/api/health", axum::routing::get(health));
    let response = router.oneshot(get_req("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn status_is_unavailable_without_entry() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(AppState {
        integration: test_integration(&dir),
    });
    let response = router.oneshot(get_req("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn status_reports_published_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let (router, integration) = running_router(&dir).await;
    let response = router.oneshot(get_req("/api/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let v = body_json(response).await;
    assert_eq!(v["entry"]["day_offset"], 2);
    assert_eq!(v["coordinator"]["state"]["kind"], "published");
    assert_eq!(v["coordinator"]["last_update_success"], true);
    assert_eq!(v["sensor_count"], 10);
    integration.unload().await.unwrap();
}

#[tokio::test]
async fn sensors_list_and_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let (router, integration) = running_router(&dir).await;

    let response = router.clone().oneshot(get_req("/api/sensors")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list.as_array().map(Vec::len), Some(10));

    let response = router
        .clone()
        .oneshot(get_req("/api/sensors/vandebron_greenPercentage_1"))
        .await
        .unwrap();
    let one = body_json(response).await;
    assert_eq!(one["state"], 88);
    assert_eq!(one["unit"], "%");

    let response = router
        .oneshot(get_req("/api/sensors/vandebron_unknown"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    integration.unload().await.unwrap();
}

#[tokio::test]
async fn snapshot_omits_failed_forecasts() {
    let dir = tempfile::tempdir().unwrap();
    let (router, integration) = running_router(&dir).await;
    let response = router.oneshot(get_req("/api/snapshot")).await.unwrap();
    let v = body_json(response).await;
    assert_eq!(v["greenest_windows"].as_array().map(Vec::len), Some(2));
    assert_eq!(v["forecast_data"].as_array().map(Vec::len), Some(0));
    assert_eq!(v["greenest_windows"][0]["greenPercentage"], 87.5);
    integration.unload().await.unwrap();
}

#[tokio::test]
async fn refresh_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let (router, integration) = running_router(&dir).await;
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    integration.unload().await.unwrap();
}

#[tokio::test]
async fn setup_start_shows_user_form() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(AppState {
        integration: test_integration(&dir),
    });
    let v = body_json(router.oneshot(get_req("/api/setup")).await.unwrap()).await;
    assert_eq!(v["type"], "form");
    assert_eq!(v["step_id"], "user");
    assert_eq!(v["schema"][0]["name"], "setup_mode");
}

#[tokio::test]
async fn setup_options_rejects_out_of_range_then_creates_entry() {
    let dir = tempfile::tempdir().unwrap();
    let integration = test_integration(&dir);
    let router = build_router(AppState {
        integration: integration.clone(),
    });

    let response = router
        .clone()
        .oneshot(post_json("/api/setup/options", serde_json::json!({"day_offset": 9})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let v = body_json(response).await;
    assert_eq!(v["errors"]["day_offset"], "out_of_range");
    assert!(!integration.is_running().await);

    let response = router
        .oneshot(post_json("/api/setup/options", serde_json::json!({"day_offset": 3})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let v = body_json(response).await;
    assert_eq!(v["data"], serde_json::json!({"day_offset": 3}));

    let stored = integration.store().load().unwrap().unwrap();
    assert_eq!(stored.day_offset(), 3);
    let active = integration.active().await.unwrap();
    assert_eq!(active.handle.day_offset(), 3);
    integration.unload().await.unwrap();
}

#[tokio::test]
async fn sensors_stream_sends_current_readings() {
    let dir = tempfile::tempdir().unwrap();
    let (router, integration) = running_router(&dir).await;

    let response = router
        .oneshot(get_req("/api/sensors/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/event-stream"));

    let mut body = response.into_body();
    let frame = tokio::time::timeout(std::time::Duration::from_secs(5), body.frame())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let data = frame.into_data().unwrap();
    let text = String::from_utf8_lossy(&data);
    assert!(text.starts_with("event: sensors\n"));
    assert!(text.contains("vandebron_forecast"));
    assert!(text.contains("vandebron_greenPercentage_2"));

    integration.unload().await.unwrap();
}

#[tokio::test]
async fn sensors_stream_needs_a_running_entry() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(AppState {
        integration: test_integration(&dir),
    });
    let response = router
        .oneshot(get_req("/api/sensors/stream"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn serve_reports_port_in_use_as_web_error() {
    let dir = tempfile::tempdir().unwrap();
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let result = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        serve(test_integration(&dir), "127.0.0.1", port),
    )
    .await
    .unwrap();
    let err = result.unwrap_err();
    assert!(matches!(err, crate::error::VandebronError::Web { .. }));
    assert!(err.to_string().contains("Failed to bind"));
}
