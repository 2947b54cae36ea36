use crate::cli::ServeArgs;
use crate::infra::{live_sinks, AppState, USER_AGENT};
use crate::routes::app_router;
use autoquiz::config::AppConfig;
use autoquiz::error::AppError;
use autoquiz::http::{HttpTransport, UreqTransport};
use autoquiz::places::PlacesService;
use autoquiz::submission::{SubmissionOrchestrator, SubmissionState};
use autoquiz::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let transport: Arc<dyn HttpTransport> =
        Arc::new(UreqTransport::new(config.delivery.timeout, USER_AGENT));
    let sinks = live_sinks(&config, Arc::clone(&transport)).await?;
    let orchestrator = SubmissionOrchestrator::from_delivery(sinks, &config.delivery);
    if orchestrator.is_empty() {
        warn!("no delivery sinks configured; submissions will be rejected");
    }
    let places = PlacesService::new(transport, &config.places);
    if !places.is_configured() {
        warn!("places API key missing; address autocomplete disabled");
    }

    let app = app_router(
        Arc::new(SubmissionState::new(orchestrator, config.configured_sinks())),
        Arc::new(places),
    )
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "lead intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
