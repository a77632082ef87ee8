use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::LendingConfig;
use crate::loans::domain::{
    ApplicationForm, ApplicationInput, BorrowerId, EmploymentStatus, LoanDuration, LoanRequest,
    LoanRequestId,
};
use crate::loans::notify::{LoanNotification, LoanNotifier, NotifyError};
use crate::loans::store::{InMemoryLoanRequestStore, LoanRequestStore, StoreError};
use crate::loans::{loan_router, EvaluationConfig, LoanLifecycleService};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Income 3000, expenses 1000, 5000 over 12 months, full-time: scores 85.
pub(super) fn scenario_a_input() -> ApplicationInput {
    ApplicationInput {
        name: "Amara Okafor".to_string(),
        email: "amara@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        location: "Lagos".to_string(),
        amount: 5000.0,
        duration: LoanDuration::Months12,
        reason: "Small business expansion".to_string(),
        employment: EmploymentStatus::FullTime,
        monthly_income: 3000.0,
        monthly_expenses: 1000.0,
        total_assets: 0.0,
        existing_debts: 0.0,
        business_plan: String::new(),
    }
}

/// Income 1000, expenses 900, 8000 over 24 months, unemployed: scores 50.
pub(super) fn scenario_b_input() -> ApplicationInput {
    ApplicationInput {
        name: "Diego Ramos".to_string(),
        email: "diego@example.com".to_string(),
        phone: "+1 555 0101".to_string(),
        location: "Quito".to_string(),
        amount: 8000.0,
        duration: LoanDuration::Months24,
        reason: "Medical emergency".to_string(),
        employment: EmploymentStatus::Unemployed,
        monthly_income: 1000.0,
        monthly_expenses: 900.0,
        total_assets: 0.0,
        existing_debts: 0.0,
        business_plan: String::new(),
    }
}

/// Scenario A but self-employed: scores 80, a soft approval.
pub(super) fn soft_approve_input() -> ApplicationInput {
    ApplicationInput {
        employment: EmploymentStatus::SelfEmployed,
        email: "priya@example.com".to_string(),
        name: "Priya Nair".to_string(),
        ..scenario_a_input()
    }
}

pub(super) fn form() -> ApplicationForm {
    ApplicationForm {
        name: "Amara Okafor".to_string(),
        email: "amara@example.com".to_string(),
        phone: "+1 555 0100".to_string(),
        location: "Lagos".to_string(),
        amount: "5000".to_string(),
        reason: "Small business expansion".to_string(),
        duration: "12".to_string(),
        employment: "full-time".to_string(),
        income: "3000".to_string(),
        expenses: "1000".to_string(),
        assets: String::new(),
        debts: String::new(),
        business_plan: String::new(),
    }
}

pub(super) fn lending_config(delay_ms: u64) -> LendingConfig {
    LendingConfig {
        evaluation_delay: Duration::from_millis(delay_ms),
        action_due_days: 5,
    }
}

pub(super) type TestService = LoanLifecycleService<InMemoryLoanRequestStore, MemoryNotifier>;

pub(super) fn build_service() -> (
    Arc<TestService>,
    Arc<InMemoryLoanRequestStore>,
    Arc<MemoryNotifier>,
) {
    build_service_with_delay(3000)
}

pub(super) fn build_service_with_delay(
    delay_ms: u64,
) -> (
    Arc<TestService>,
    Arc<InMemoryLoanRequestStore>,
    Arc<MemoryNotifier>,
) {
    let store = Arc::new(InMemoryLoanRequestStore::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = LoanLifecycleService::new(
        store.clone(),
        notifier.clone(),
        EvaluationConfig::default(),
        lending_config(delay_ms),
    )
    .with_clock(fixed_now);
    (Arc::new(service), store, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<LoanNotification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<LoanNotification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }

    pub(super) fn templates(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|event| event.template)
            .collect()
    }
}

impl LoanNotifier for MemoryNotifier {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl LoanNotifier for OfflineNotifier {
    fn publish(&self, _notification: LoanNotification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp relay down".to_string()))
    }
}

pub(super) struct UnavailableStore;

impl LoanRequestStore for UnavailableStore {
    fn insert(&self, _request: LoanRequest) -> Result<LoanRequest, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn put(&self, _request: LoanRequest) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn get(&self, _id: &LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn list(&self, _borrower: &BorrowerId) -> Result<Vec<LoanRequest>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

/// Submit and evaluate immediately, skipping the timer.
pub(super) fn evaluated(service: &TestService, input: ApplicationInput) -> LoanRequest {
    let submitted = service.submit(input).expect("submission accepted");
    service.evaluate(&submitted.id).expect("evaluation runs")
}

pub(super) fn router_with_service(service: Arc<TestService>) -> axum::Router {
    loan_router(service)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
