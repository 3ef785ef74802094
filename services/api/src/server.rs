use crate::cli::ServeArgs;
use crate::infra::{resolve_catalog, AppState};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use storefit::config::AppConfig;
use storefit::diagnosis::DiagnosisEngine;
use storefit::error::AppError;
use storefit::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let catalog = resolve_catalog(&config.catalog, args.catalog.take())?;
    info!(
        dimensions = catalog.dimensions.len(),
        rules = catalog.rules.len(),
        "diagnosis catalog loaded"
    );
    let engine = Arc::new(DiagnosisEngine::new(catalog));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        started_at: Utc::now(),
    };

    let app = with_operational_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "store diagnosis service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
