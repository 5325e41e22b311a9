use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, CorsLayer};

use jobportal_core::envelope::Envelope;
use jobportal_storage::Database;

use crate::{application, company, job, telemetry, user};

#[derive(Clone)]
pub struct AppState {
    metrics: PrometheusHandle,
    storage: Database,
    clock: Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AppState {
    pub fn new(metrics: PrometheusHandle, storage: Database) -> Self {
        Self {
            metrics,
            storage,
            clock: Arc::new(Utc::now),
        }
    }

    pub fn metrics(&self) -> &PrometheusHandle {
        &self.metrics
    }

    pub fn storage(&self) -> &Database {
        &self.storage
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}

pub fn app_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/metrics", get(metrics))
        .nest("/api/user", user::router())
        .nest("/api/company", company::router())
        .nest("/api/job", job::router())
        .nest("/api/application", application::router())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn root() -> impl IntoResponse {
    Json(json!({ "message": "Online Job Portal Backend API is running!" }))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

pub(crate) fn track(resource: &'static str) {
    counter!("api_requests_total", "resource" => resource).increment(1);
}

pub(crate) fn respond<T: Serialize>(status: StatusCode, envelope: Envelope<T>) -> Response {
    (status, Json(envelope)).into_response()
}

/// Answers with a `success:false` envelope and counts the rejection.
pub(crate) fn reject(resource: &'static str, status: StatusCode, message: &str) -> Response {
    counter!("api_rejections_total", "resource" => resource).increment(1);
    respond(status, Envelope::<()>::fail(message))
}

/// Logs an unexpected storage failure and answers with a 500 envelope.
pub(crate) fn internal(resource: &'static str, err: impl std::fmt::Display) -> Response {
    tracing::error!(resource, error = %err, "storage failure");
    respond(
        StatusCode::INTERNAL_SERVER_ERROR,
        Envelope::<()>::fail("internal server error"),
    )
}
