use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Deserialize;
use wxdecode_config::AppConfig;
use wxdecode_core::{DecodeError, FeatureRow, Metar, Processor, RawReport, Taf};

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    decoded_total: Counter<u64>,
    failed_total: Counter<u64>,
    processor: Processor,
}

impl AppState {
    fn record(&self, kind: &'static str, outcome: &Result<impl Sized, DecodeError>) {
        let attrs = [KeyValue::new("kind", kind)];
        match outcome {
            Ok(_) => self.decoded_total.add(1, &attrs),
            Err(_) => self.failed_total.add(1, &attrs),
        }
    }
}

pub fn build_app(cfg: &AppConfig) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("wxdecode-server");

    let requests_total = meter
        .u64_counter("wxdecode_requests_total")
        .with_description("Total HTTP requests served")
        .init();
    let decoded_total = meter
        .u64_counter("wxdecode_reports_decoded_total")
        .with_description("Reports decoded successfully")
        .init();
    let failed_total = meter
        .u64_counter("wxdecode_reports_failed_total")
        .with_description("Reports rejected by the decoder")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        decoded_total,
        failed_total,
        processor: cfg.processor(),
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/metar", post(decode_metar))
        .route("/api/v1/taf", post(decode_taf))
        .route("/api/v1/features/metar", post(features_metar))
        .route("/api/v1/features/taf", post(features_taf))
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

/// Decoder failures surface as 422 with a JSON error body
struct ApiError(StatusCode, String);

impl From<DecodeError> for ApiError {
    fn from(e: DecodeError) -> Self {
        ApiError(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError(status, message) = self;
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.requests_total.add(1, &[]);
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn decode_metar(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<Metar>, ApiError> {
    state.requests_total.add(1, &[]);
    let metar = Metar::from_text(&body);
    state.record("METAR", &metar);
    Ok(Json(metar?))
}

#[derive(Deserialize)]
struct TafQuery {
    propagate: Option<bool>,
}

async fn decode_taf(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TafQuery>,
    body: String,
) -> Result<Json<Taf>, ApiError> {
    state.requests_total.add(1, &[]);
    let taf = Taf::from_text(&body);
    state.record("TAF", &taf);

    let taf = taf?;
    if q.propagate.unwrap_or(state.processor.propagate) {
        Ok(Json(taf.propagate()))
    } else {
        Ok(Json(taf))
    }
}

async fn features_metar(
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<RawReport>>,
) -> Result<Json<Vec<FeatureRow>>, ApiError> {
    state.requests_total.add(1, &[]);
    let processor = state.processor;
    run_batch(move || processor.metars(&items)).await
}

async fn features_taf(
    State(state): State<Arc<AppState>>,
    Json(items): Json<Vec<RawReport>>,
) -> Result<Json<Vec<FeatureRow>>, ApiError> {
    state.requests_total.add(1, &[]);
    let processor = state.processor;
    run_batch(move || processor.tafs(&items)).await
}

/// Batches fan out on the rayon pool, off the async workers
async fn run_batch<F>(job: F) -> Result<Json<Vec<FeatureRow>>, ApiError>
where
    F: FnOnce() -> Result<Vec<FeatureRow>, DecodeError> + Send + 'static,
{
    let rows = tokio::task::spawn_blocking(job).await.map_err(|e| {
        tracing::error!(error=?e, "batch task failed");
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, "batch task failed".into())
    })??;
    Ok(Json(rows))
}
