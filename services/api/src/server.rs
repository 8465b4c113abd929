use crate::cli::ServeArgs;
use crate::infra::{build_store, AppState};
use crate::routes::with_portal_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use becas::config::AppConfig;
use becas::error::AppError;
use becas::telemetry;
use becas::workflows::scholarships::ScholarshipPortal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
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

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store_config = config.store.clone();
    let store = tokio::task::spawn_blocking(move || build_store(&store_config)).await??;
    let portal = Arc::new(ScholarshipPortal::new(store, config.policy.clone()));

    let app = with_portal_routes(portal)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, backend = ?config.store.backend, "scholarship portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
