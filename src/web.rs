//! Axum-based HTTP surface: sensors, snapshot, status and the setup flow

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::entry::{ActiveEntry, ConfigEntry, Integration};
use crate::error::VandebronError;
use crate::setup::{FlowInput, FlowResult, SetupFlow};

#[derive(Clone)]
pub struct AppState {
    pub integration: Arc<Integration>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn no_entry() -> Response {
    error_response(StatusCode::SERVICE_UNAVAILABLE, "No config entry is running")
}

async fn active_entry(state: &AppState) -> Result<ActiveEntry, Response> {
    state.integration.active().await.ok_or_else(no_entry)
}

pub(crate) async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub(crate) async fn status(State(state): State<AppState>) -> Response {
    let active = match active_entry(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let entry = &active.entry;
    Json(json!({
        "entry": {
            "entry_id": entry.entry_id,
            "title": entry.title,
            "day_offset": entry.day_offset(),
            "created_at": entry.created_at,
        },
        "coordinator": active.handle.status(),
        "sensor_count": active.sensors.entities().len(),
    }))
    .into_response()
}

pub(crate) async fn sensors(State(state): State<AppState>) -> Response {
    match active_entry(&state).await {
        Ok(active) => Json(active.sensors.readings().as_ref().clone()).into_response(),
        Err(resp) => resp,
    }
}

pub(crate) async fn sensor(
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> Response {
    let active = match active_entry(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match active.sensors.reading(&unique_id) {
        Some(reading) => Json(reading).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Unknown sensor '{}'", unique_id),
        ),
    }
}

async fn sensors_stream(State(state): State<AppState>) -> Response {
    let active = match active_entry(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let stream = WatchStream::new(active.sensors.subscribe()).map(|readings| {
        let event = match Event::default().event("sensors").json_data(readings.as_ref()) {
            Ok(ev) => ev,
            Err(e) => Event::default().event("error").data(e.to_string()),
        };
        Ok::<Event, Infallible>(event)
    });
    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}

pub(crate) async fn snapshot(State(state): State<AppState>) -> Response {
    match active_entry(&state).await {
        Ok(active) => Json(active.handle.snapshot().as_ref().clone()).into_response(),
        Err(resp) => resp,
    }
}

pub(crate) async fn refresh(State(state): State<AppState>) -> Response {
    let active = match active_entry(&state).await {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match active.handle.request_refresh() {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))).into_response(),
        Err(e) => error_response(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    }
}

pub(crate) async fn setup_start() -> Json<FlowResult> {
    Json(SetupFlow::new().step_user(None))
}

/// Form results go back as-is; a created entry is persisted and loaded
async fn finish_step(state: &AppState, result: FlowResult) -> Response {
    let Some(data) = result.entry_data().cloned() else {
        return Json(result).into_response();
    };
    match state.integration.reconfigure(data).await {
        Ok(entry) => (StatusCode::CREATED, Json(entry_created(&entry))).into_response(),
        Err(e) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
    }
}

fn entry_created(entry: &ConfigEntry) -> serde_json::Value {
    json!({
        "type": "create_entry",
        "title": entry.title,
        "entry_id": entry.entry_id,
        "data": entry.data,
    })
}

pub(crate) async fn setup_user(
    State(state): State<AppState>,
    Json(input): Json<FlowInput>,
) -> Response {
    let result = SetupFlow::new().step_user(Some(&input));
    finish_step(&state, result).await
}

pub(crate) async fn setup_options(
    State(state): State<AppState>,
    Json(input): Json<FlowInput>,
) -> Response {
    let result = SetupFlow::new().step_options(Some(&input));
    finish_step(&state, result).await
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/sensors", get(sensors))
        .route("/api/sensors/stream", get(sensors_stream))
        .route("/api/sensors/{unique_id}", get(sensor))
        .route("/api/snapshot", get(snapshot))
        .route("/api/refresh", post(refresh))
        .route("/api/setup", get(setup_start))
        .route("/api/setup/user", post(setup_user))
        .route("/api/setup/options", post(setup_options))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(integration: Arc<Integration>, host: &str, port: u16) -> crate::error::Result<()> {
    let router = build_router(AppState { integration });

    let logger = crate::logging::get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VandebronError::web(format!("Failed to bind {}: {}", addr, e)))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| VandebronError::web(format!("Failed to read local address: {}", e)))?;
    logger.info(&format!(
        "Web server listening at http://{}:{}",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router)
        .await
        .map_err(|e| VandebronError::web(e.to_string()))
}
