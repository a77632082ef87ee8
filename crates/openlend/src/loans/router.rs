use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::actions::{ActionFilter, ActionSort};
use super::domain::{ActionId, ApplicationForm, ApplicationInput, BorrowerId, LoanRequestId};
use super::notify::LoanNotifier;
use super::service::{LoanLifecycleService, LoanServiceError};
use super::store::{LoanRequestStore, StoreError};

type SharedService<S, N> = Arc<LoanLifecycleService<S, N>>;

/// Router exposing intake, status, and action endpoints.
pub fn loan_router<S, N>(service: SharedService<S, N>) -> Router
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    Router::new()
        .route("/api/v1/loans", post(submit_handler::<S, N>))
        .route("/api/v1/loans/form", post(submit_form_handler::<S, N>))
        .route("/api/v1/loans/:loan_id", get(request_handler::<S, N>))
        .route(
            "/api/v1/borrowers/:borrower_id/loans",
            get(borrower_requests_handler::<S, N>),
        )
        .route(
            "/api/v1/loans/:loan_id/actions",
            get(actions_handler::<S, N>),
        )
        .route(
            "/api/v1/loans/:loan_id/actions/:action_id/complete",
            post(complete_action_handler::<S, N>),
        )
        .route(
            "/api/v1/loans/:loan_id/actions/:action_id/documents",
            post(upload_document_handler::<S, N>),
        )
        .route("/api/v1/loans/:loan_id/reject", post(reject_handler::<S, N>))
        .route(
            "/api/v1/loans/:loan_id/feedback",
            post(feedback_handler::<S, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActionQuery {
    #[serde(default)]
    pub(crate) filter: ActionFilter,
    #[serde(default)]
    pub(crate) sort: ActionSort,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentUpload {
    pub(crate) document_name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewerMessage {
    pub(crate) message: String,
}

pub(crate) async fn submit_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(input): Json<ApplicationInput>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    let submitted = service.submit(input);
    accept_and_schedule(&service, submitted)
}

pub(crate) async fn submit_form_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Json(form): Json<ApplicationForm>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    let submitted = service.submit_form(form);
    accept_and_schedule(&service, submitted)
}

fn accept_and_schedule<S, N>(
    service: &SharedService<S, N>,
    submitted: Result<super::domain::LoanRequest, LoanServiceError>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match submitted {
        Ok(request) => {
            if let Err(err) = service.schedule_evaluation(&request.id) {
                warn!(loan_id = %request.id, error = %err, "failed to schedule evaluation");
                return error_response(err);
            }
            (StatusCode::ACCEPTED, Json(request.status_view())).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn request_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(loan_id): Path<String>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.get(&LoanRequestId(loan_id)) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn borrower_requests_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(borrower_id): Path<String>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.list_requests(&BorrowerId::from_email(&borrower_id)) {
        Ok(requests) => {
            let views: Vec<_> = requests.iter().map(|request| request.status_view()).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn actions_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(loan_id): Path<String>,
    Query(query): Query<ActionQuery>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.list_actions(&LoanRequestId(loan_id), query.filter, query.sort) {
        Ok(actions) => (StatusCode::OK, Json(actions)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_action_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((loan_id, action_id)): Path<(String, String)>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.complete_action(&LoanRequestId(loan_id), &ActionId(action_id)) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upload_document_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path((loan_id, action_id)): Path<(String, String)>,
    Json(upload): Json<DocumentUpload>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.upload_document(
        &LoanRequestId(loan_id),
        &ActionId(action_id),
        &upload.document_name,
    ) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(loan_id): Path<String>,
    Json(body): Json<ReviewerMessage>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.reject(&LoanRequestId(loan_id), &body.message) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn feedback_handler<S, N>(
    State(service): State<SharedService<S, N>>,
    Path(loan_id): Path<String>,
    Json(body): Json<ReviewerMessage>,
) -> Response
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    match service.post_feedback(&LoanRequestId(loan_id), &body.message) {
        Ok(request) => (StatusCode::OK, Json(request)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: LoanServiceError) -> Response {
    let status = match &err {
        LoanServiceError::Validation(_) | LoanServiceError::Action(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        err if err.is_not_found() => StatusCode::NOT_FOUND,
        LoanServiceError::InvalidState { .. } | LoanServiceError::Store(StoreError::Conflict) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
