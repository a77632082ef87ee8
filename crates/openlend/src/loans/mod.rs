//! Loan application lifecycle: intake, scoring, follow-up actions, and the delayed decision.

pub mod actions;
pub mod domain;
pub mod evaluation;
pub mod intake;
pub mod notify;
pub mod router;
pub mod scheduler;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use actions::{
    ActionDraft, ActionError, ActionFilter, ActionSort, ActionSummary, ActionTracker, Completion,
};
pub use domain::{
    ActionId, ActionPriority, ActionType, ApplicationForm, ApplicationInput, BorrowerId,
    EmploymentStatus, LoanDuration, LoanRequest, LoanRequestId, LoanStatus, LoanStatusView,
    LoanTerms, PendingAction,
};
pub use evaluation::{
    Assessment, EvaluationConfig, EvaluationDecision, EvaluationEngine, EvaluationOutcome,
    Explanation, ScoreComponent, ScoreFactor,
};
pub use intake::{IntakeGuard, ValidationError};
pub use notify::{LoanNotification, LoanNotifier, NotifyError};
pub use router::loan_router;
pub use scheduler::{EvaluationHandle, EvaluationScheduler, SchedulerError};
pub use service::{Clock, LoanLifecycleService, LoanServiceError};
pub use store::{InMemoryLoanRequestStore, LoanRequestStore, StoreError};
