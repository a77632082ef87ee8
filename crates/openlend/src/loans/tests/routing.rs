use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::config::LendingConfig;
use crate::loans::router::{request_handler, submit_handler};
use crate::loans::{EvaluationConfig, InMemoryLoanRequestStore, LoanLifecycleService};

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn submit_route_accepts_and_reports_review() {
    let (service, _store, _notifier) = build_service();
    let router = router_with_service(service.clone());

    let payload = serde_json::to_value(scenario_a_input()).unwrap();
    let response = router
        .oneshot(post_json("/api/v1/loans", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["loan_id"], "loan-000001");
    assert_eq!(body["status"], "reviewing");
    assert_eq!(body["score"], 85);
    assert_eq!(body["outstanding_actions"], 0);
    assert!(service.is_evaluation_scheduled(&crate::loans::LoanRequestId(
        "loan-000001".to_string()
    )));
}

#[tokio::test]
async fn form_route_applies_lenient_intake() {
    let (service, _store, _notifier) = build_service();
    let router = router_with_service(service);

    let payload = json!({
        "name": "Amara Okafor",
        "email": "amara@example.com",
        "phone": "+1 555 0100",
        "location": "Lagos",
        "amount": "$5,000",
        "reason": "Small business expansion",
        "employment": "full-time",
        "income": "3000",
        "expenses": "1000"
    });
    let response = router
        .oneshot(post_json("/api/v1/loans/form", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["score"], 85);
}

#[tokio::test]
async fn invalid_submission_is_unprocessable() {
    let (service, store, _notifier) = build_service();
    let router = router_with_service(service);

    let mut input = scenario_a_input();
    input.email = "not-an-email".to_string();
    let payload = serde_json::to_value(input).unwrap();
    let response = router
        .oneshot(post_json("/api/v1/loans", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "email address is not valid");
    assert!(store.is_empty());
}

#[tokio::test]
async fn unknown_loan_is_not_found() {
    let (service, _store, _notifier) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/loans/loan-404404"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rejecting_approved_loan_conflicts() {
    let (service, _store, _notifier) = build_service();
    let request = evaluated(&service, scenario_a_input());
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/loans/{}/reject", request.id),
            &json!({ "message": "Too late" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn actions_route_filters_and_sorts() {
    let (service, _store, _notifier) = build_service();
    let request = evaluated(&service, scenario_b_input());
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(get(&format!(
            "/api/v1/loans/{}/actions?filter=pending&sort=due_date",
            request.id
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let actions = body.as_array().expect("action list");
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], "document_upload");
    assert_eq!(actions[0]["priority"], "high");

    let response = router
        .oneshot(get(&format!(
            "/api/v1/loans/{}/actions?filter=completed",
            request.id
        )))
        .await
        .unwrap();
    let body = read_json_body(response).await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn document_upload_route_completes_action() {
    let (service, _store, notifier) = build_service();
    let request = evaluated(&service, scenario_b_input());
    let action_id = request.pending_actions[0].id.clone();
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/loans/{}/actions/{}/documents", request.id, action_id),
            &json!({ "document_name": "statements.pdf" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["pending_actions"][0]["completed"], true);
    assert_eq!(
        body["pending_actions"][0]["uploaded_documents"],
        json!(["statements.pdf"])
    );
    assert_eq!(
        notifier.templates().last().map(String::as_str),
        Some("actions_completed")
    );
}

#[tokio::test]
async fn unknown_action_route_is_not_found() {
    let (service, _store, _notifier) = build_service();
    let request = evaluated(&service, scenario_b_input());
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/loans/{}/actions/nope/complete", request.id),
            &json!({}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn borrower_route_lists_status_views_newest_first() {
    let (service, _store, _notifier) = build_service();
    evaluated(&service, scenario_a_input());
    service.submit(scenario_a_input()).expect("second submission");
    let router = router_with_service(service);

    let response = router
        .oneshot(get("/api/v1/borrowers/Amara@Example.com/loans"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["loan_id"], "loan-000002");
    assert_eq!(body[0]["status"], "reviewing");
    assert_eq!(body[1]["status"], "approved");
    assert_eq!(body[1]["rate"], 3.8);
    assert_eq!(body[1]["monthly_payment"], 433);
}

#[tokio::test]
async fn feedback_route_replaces_message() {
    let (service, _store, _notifier) = build_service();
    let request = evaluated(&service, soft_approve_input());
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/loans/{}/feedback", request.id),
            &json!({ "message": "Call us to confirm." }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["feedback"], "Call us to confirm.");
    assert_eq!(body["status"], "pending");
}

#[tokio::test]
async fn submit_handler_reports_store_outage() {
    let service = Arc::new(LoanLifecycleService::new(
        Arc::new(UnavailableStore),
        Arc::new(MemoryNotifier::default()),
        EvaluationConfig::default(),
        LendingConfig::default(),
    ));

    let response = submit_handler::<UnavailableStore, MemoryNotifier>(
        State(service),
        axum::Json(scenario_a_input()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn submission_is_accepted_and_scheduled_when_notifier_is_offline() {
    let service = Arc::new(
        LoanLifecycleService::new(
            Arc::new(InMemoryLoanRequestStore::default()),
            Arc::new(OfflineNotifier),
            EvaluationConfig::default(),
            LendingConfig::default(),
        )
        .with_clock(fixed_now),
    );

    let response = submit_handler::<InMemoryLoanRequestStore, OfflineNotifier>(
        State(service.clone()),
        axum::Json(scenario_a_input()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["loan_id"], "loan-000001");
    assert_eq!(body["status"], "reviewing");
    assert!(service.is_evaluation_scheduled(&crate::loans::LoanRequestId(
        "loan-000001".to_string()
    )));
    service.shutdown();
}

#[tokio::test]
async fn request_handler_returns_full_record() {
    let (service, _store, _notifier) = build_service();
    let request = evaluated(&service, scenario_b_input());

    let response = request_handler::<_, MemoryNotifier>(State(service), Path(request.id.0.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "action_required");
    assert_eq!(
        body["risk_factors"],
        json!([
            "Tight budget margins",
            "Unemployment risk",
            "Limited asset coverage",
            "Below average credibility score"
        ])
    );
}
