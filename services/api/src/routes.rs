use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use openlend::error::AppError;
use openlend::loans::{
    loan_router, ApplicationForm, EvaluationOutcome, IntakeGuard, LoanLifecycleService,
    LoanNotifier, LoanRequestStore, LoanServiceError,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_loan_routes<S, N>(service: Arc<LoanLifecycleService<S, N>>) -> axum::Router
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    loan_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/loans/preview",
            axum::routing::post(preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Score a form the way a submission would be scored, without creating a loan request.
pub(crate) async fn preview_endpoint(
    Extension(state): Extension<AppState>,
    Json(form): Json<ApplicationForm>,
) -> Result<Json<EvaluationOutcome>, AppError> {
    let input = IntakeGuard::new()
        .admit(form)
        .map_err(LoanServiceError::from)?;
    Ok(Json(state.engine.evaluate(&input)))
}
