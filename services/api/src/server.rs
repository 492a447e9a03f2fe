use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_flow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobbot::config::AppConfig;
use jobbot::error::AppError;
use jobbot::telemetry;
use jobbot::workflows::application::{
    ApplicationFlowService, HttpJobBotBackend, SimulatedPaymentGateway,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(backend_url) = args.backend_url.take() {
        config.backend.base_url = backend_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let backend = Arc::new(HttpJobBotBackend::new(&config.backend)?);
    let payments = Arc::new(SimulatedPaymentGateway::new(config.payment.delay()));
    let flow_service = Arc::new(ApplicationFlowService::new(backend, payments));

    let sweeper = Arc::clone(&flow_service);
    let sessions = config.sessions.clone();
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticks.tick().await;
            let evicted = sweeper
                .evict_stale(sessions.idle(), sessions.finished())
                .await;
            debug!(evicted, open = sweeper.open_flows(), "swept application flows");
        }
    });

    let app = with_flow_routes(flow_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        backend = %config.backend.base_url,
        "application bot service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
