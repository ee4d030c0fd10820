use axum::{
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollen_core::cache::coordinator::{PollenService, Served};
use pollen_core::cache::CacheStore;
use pollen_core::domain::pollen::SourceKind;
use pollen_core::domain::severity::SeverityLevel;

const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-pollen-source");
const CACHE_HEADER: HeaderName = HeaderName::from_static("x-cache");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = pollen_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = Arc::new(CacheStore::new());
    let service = match PollenService::from_settings(&settings, store) {
        Ok(service) => service,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "failed to build pollen service");
            return Err(e);
        }
    };

    let state = AppState {
        service: Arc::new(service),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/healthz/upstream", get(upstream_health))
        .route("/api/pollen", get(get_pollen))
        .route("/api/pollen/mock", get(get_mock_pollen))
        .route("/api/pollen/summary", get(get_summary))
        .route("/api/severity/:count", get(get_severity))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, source = %settings.source_url, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    service: Arc<PollenService>,
}

async fn healthz() -> &'static str {
    "ok"
}

/// 200 while the primary key holds live data, 503 while it holds the fallback.
async fn upstream_health(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let served = state.service.pollen_data().await;
    match served.kind() {
        SourceKind::Live => (StatusCode::OK, "live"),
        SourceKind::Synthetic => (StatusCode::SERVICE_UNAVAILABLE, "synthetic"),
    }
}

async fn get_pollen(State(state): State<AppState>) -> Response {
    let served = state.service.pollen_data().await;
    with_provenance(&served, Json(served.data.as_ref().clone()))
}

async fn get_mock_pollen(State(state): State<AppState>) -> Response {
    Json(state.service.mock_data()).into_response()
}

async fn get_summary(State(state): State<AppState>) -> Response {
    let served = state.service.preview_data().await;
    with_provenance(&served, Json(served.data.summary()))
}

#[derive(Debug, Serialize)]
struct SeverityView {
    count: u32,
    level: SeverityLevel,
    description: &'static str,
    color: &'static str,
}

async fn get_severity(
    State(state): State<AppState>,
    Path(count): Path<String>,
) -> Result<Json<SeverityView>, StatusCode> {
    let count: u32 = count.trim().parse().map_err(|_| StatusCode::BAD_REQUEST)?;
    let level = state.service.severity_level(count);
    Ok(Json(SeverityView {
        count,
        level,
        description: level.description(),
        color: level.color(),
    }))
}

fn with_provenance(served: &Served, body: impl IntoResponse) -> Response {
    let mut res = body.into_response();
    let headers = res.headers_mut();
    headers.insert(
        SOURCE_HEADER,
        HeaderValue::from_static(served.kind().as_str()),
    );
    headers.insert(CACHE_HEADER, HeaderValue::from_static(served.cache.as_str()));
    res
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &pollen_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
