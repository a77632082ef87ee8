use crate::cli::ServeArgs;
use crate::infra::{AppState, LoggingNotifier};
use crate::routes::with_loan_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use openlend::config::AppConfig;
use openlend::error::AppError;
use openlend::loans::{EvaluationConfig, InMemoryLoanRequestStore, LoanLifecycleService};
use openlend::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(delay_ms) = args.evaluation_delay_ms.take() {
        config.lending.evaluation_delay = Duration::from_millis(delay_ms);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));

    let store = Arc::new(InMemoryLoanRequestStore::default());
    let notifier = Arc::new(LoggingNotifier::default());
    let loan_service = Arc::new(LoanLifecycleService::new(
        store,
        notifier,
        EvaluationConfig::default(),
        config.lending.clone(),
    ));

    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        engine: loan_service.engine().clone(),
    };

    let app = with_loan_routes(loan_service.clone())
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        evaluation_delay_ms = config.lending.evaluation_delay.as_millis() as u64,
        "loan lifecycle service ready"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    let aborted = loan_service.shutdown();
    info!(aborted, "pending evaluations cancelled on shutdown");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
