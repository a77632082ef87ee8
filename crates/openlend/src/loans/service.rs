use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::LendingConfig;

use super::actions::{
    ActionDraft, ActionError, ActionFilter, ActionSort, ActionSummary, ActionTracker, Completion,
};
use super::domain::{
    ActionId, ApplicationForm, ApplicationInput, BorrowerId, LoanRequest, LoanRequestId,
    LoanStatus, PendingAction,
};
use super::evaluation::{EvaluationConfig, EvaluationDecision, EvaluationEngine};
use super::intake::{IntakeGuard, ValidationError};
use super::notify::{LoanNotification, LoanNotifier};
use super::scheduler::{EvaluationHandle, EvaluationScheduler, SchedulerError};
use super::store::{LoanRequestStore, StoreError};

/// Source of the current time; swapped out in tests.
pub type Clock = fn() -> DateTime<Utc>;

const REVIEWING_FEEDBACK: &str = "Your application is being reviewed.";
const ACTIONS_COMPLETED_FEEDBACK: &str =
    "All required actions completed. A reviewer will finalize your application.";
const REVIEWER_CLOSED_NOTE: &str = "Closed by reviewer decision";

/// Lifecycle controller composing intake, evaluation, action tracking, and the store.
///
/// Every mutation of a single loan request runs under that request's lock, so a borrower
/// completing an action cannot race the scheduled evaluation of the same record.
pub struct LoanLifecycleService<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    guard: IntakeGuard,
    engine: EvaluationEngine,
    tracker: ActionTracker,
    scheduler: EvaluationScheduler,
    locks: Mutex<HashMap<LoanRequestId, Arc<Mutex<()>>>>,
    sequence: AtomicU64,
    clock: Clock,
}

impl<S, N> LoanLifecycleService<S, N>
where
    S: LoanRequestStore + 'static,
    N: LoanNotifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        config: EvaluationConfig,
        lending: LendingConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            guard: IntakeGuard::new(),
            engine: EvaluationEngine::new(config),
            tracker: ActionTracker::new(lending.action_due_days),
            scheduler: EvaluationScheduler::new(lending.evaluation_delay),
            locks: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn engine(&self) -> &EvaluationEngine {
        &self.engine
    }

    fn next_loan_id(&self) -> LoanRequestId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        LoanRequestId(format!("loan-{id:06}"))
    }

    /// Validate, score, and store a new application. The record comes back `reviewing` with
    /// its score and explanation already attached.
    pub fn submit(&self, input: ApplicationInput) -> Result<LoanRequest, LoanServiceError> {
        self.guard.validate(&input)?;

        let now = (self.clock)();
        let assessment = self.engine.assess(&input);
        let mut request = LoanRequest {
            id: self.next_loan_id(),
            borrower: input.borrower_id(),
            amount: input.amount,
            duration: input.duration,
            reason: input.reason.clone(),
            status: LoanStatus::Submitted,
            score: Some(assessment.score),
            score_components: assessment.components,
            terms: None,
            strength_factors: assessment.explanation.strengths,
            risk_factors: assessment.explanation.risks,
            pending_actions: Vec::new(),
            feedback: None,
            submitted_at: now,
            updated_at: now,
        };

        // Accepted submissions go straight into review.
        request.status = LoanStatus::Reviewing;
        request.feedback = Some(REVIEWING_FEEDBACK.to_string());

        let stored = self.store.insert(request)?;
        info!(
            loan_id = %stored.id,
            borrower = %stored.borrower,
            score = assessment.score,
            "loan request submitted"
        );
        self.notify("loan_submitted", &stored);
        Ok(stored)
    }

    /// Admit a raw form and submit it.
    pub fn submit_form(&self, form: ApplicationForm) -> Result<LoanRequest, LoanServiceError> {
        let input = self.guard.admit(form)?;
        self.submit(input)
    }

    /// Arrange for [`evaluate`](Self::evaluate) to run after the configured delay.
    pub fn schedule_evaluation(
        self: &Arc<Self>,
        loan_id: &LoanRequestId,
    ) -> Result<EvaluationHandle, LoanServiceError> {
        let request = self.fetch(loan_id)?;
        if request.status != LoanStatus::Reviewing {
            return Err(LoanServiceError::InvalidState {
                loan_id: loan_id.clone(),
                status: request.status,
                operation: "schedule an evaluation",
            });
        }

        let service = Arc::downgrade(self);
        let target = loan_id.clone();
        let handle = self.scheduler.schedule(loan_id.clone(), move || {
            if let Some(service) = service.upgrade() {
                service.run_scheduled_evaluation(&target);
            }
        })?;
        Ok(handle)
    }

    fn run_scheduled_evaluation(&self, loan_id: &LoanRequestId) {
        match self.evaluate(loan_id) {
            Ok(_) => {}
            Err(LoanServiceError::LoanNotFound(_)) => {
                debug!(loan_id = %loan_id, "loan request gone before evaluation fired");
            }
            Err(err) => {
                warn!(loan_id = %loan_id, error = %err, "scheduled evaluation failed");
            }
        }
    }

    /// Apply the scoring decision to a `reviewing` request. Requests that already left review
    /// are returned untouched, so running this twice changes state once.
    pub fn evaluate(&self, loan_id: &LoanRequestId) -> Result<LoanRequest, LoanServiceError> {
        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        if request.status != LoanStatus::Reviewing {
            debug!(loan_id = %loan_id, status = %request.status, "evaluation skipped");
            return Ok(request);
        }

        let score = match request.score {
            Some(score) => score,
            None => self.engine.config().min_score,
        };
        let decision = self
            .engine
            .decide(score, request.amount, request.duration);

        request.status = decision.status();
        request.terms = decision.terms();
        if matches!(decision, EvaluationDecision::RequestDocuments) {
            let draft = self.tracker.document_request(request.submitted_at);
            self.tracker.create(&mut request, draft);
        }
        request.feedback = Some(decision.summary());
        request.updated_at = (self.clock)();

        self.store.put(request.clone())?;
        info!(
            loan_id = %loan_id,
            score,
            status = %request.status,
            "loan request evaluated"
        );

        let template = match request.status {
            LoanStatus::Approved => "loan_approved",
            LoanStatus::Pending => "loan_pending",
            _ => "loan_action_required",
        };
        self.notify(template, &request);
        Ok(request)
    }

    /// Open a follow-up action on a request. A soft-approved request moves back to
    /// `action_required` and its quoted terms are withdrawn.
    pub fn create_action(
        &self,
        loan_id: &LoanRequestId,
        draft: ActionDraft,
    ) -> Result<PendingAction, LoanServiceError> {
        if draft.title.trim().is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }

        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        match request.status {
            LoanStatus::ActionRequired => {}
            LoanStatus::Pending => {
                request.status = LoanStatus::ActionRequired;
                request.terms = None;
            }
            status => {
                return Err(LoanServiceError::InvalidState {
                    loan_id: loan_id.clone(),
                    status,
                    operation: "open an action",
                })
            }
        }

        let action = self.tracker.create(&mut request, draft);
        request.feedback = Some(format!("New action required: {}", action.title));
        request.updated_at = (self.clock)();

        self.store.put(request.clone())?;
        info!(loan_id = %loan_id, action_id = %action.id, "action opened");
        self.notify("loan_action_required", &request);
        Ok(action)
    }

    /// Mark an action done. Completing an already completed action changes nothing.
    pub fn complete_action(
        &self,
        loan_id: &LoanRequestId,
        action_id: &ActionId,
    ) -> Result<LoanRequest, LoanServiceError> {
        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        ensure_action_exists(&request, action_id)?;
        ensure_actionable(&request, "complete an action")?;

        let now = (self.clock)();
        let completion = self
            .tracker
            .complete(&mut request, action_id, now)
            .map_err(|err| action_error(loan_id, err))?;
        self.record_completion(request, action_id, completion, now)
    }

    /// Record an uploaded document against a document request, completing it.
    pub fn upload_document(
        &self,
        loan_id: &LoanRequestId,
        action_id: &ActionId,
        document_name: &str,
    ) -> Result<LoanRequest, LoanServiceError> {
        if document_name.trim().is_empty() {
            return Err(ValidationError::MissingField("document_name").into());
        }

        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        ensure_action_exists(&request, action_id)?;
        ensure_actionable(&request, "upload a document")?;

        let now = (self.clock)();
        let completion = self
            .tracker
            .attach_document(&mut request, action_id, document_name.trim(), now)
            .map_err(|err| action_error(loan_id, err))?;
        self.record_completion(request, action_id, completion, now)
    }

    fn record_completion(
        &self,
        mut request: LoanRequest,
        action_id: &ActionId,
        completion: Completion,
        now: DateTime<Utc>,
    ) -> Result<LoanRequest, LoanServiceError> {
        if completion == Completion::AlreadyCompleted {
            debug!(loan_id = %request.id, action_id = %action_id, "action already completed");
            return Ok(request);
        }

        let all_done = self.tracker.all_completed(&request);
        if all_done {
            request.feedback = Some(ACTIONS_COMPLETED_FEEDBACK.to_string());
        }
        request.updated_at = now;

        self.store.put(request.clone())?;
        info!(loan_id = %request.id, action_id = %action_id, all_done, "action completed");
        if all_done {
            self.notify("actions_completed", &request);
        }
        Ok(request)
    }

    /// Reviewer rejection; the only way into `rejected`.
    pub fn reject(
        &self,
        loan_id: &LoanRequestId,
        reason: &str,
    ) -> Result<LoanRequest, LoanServiceError> {
        if reason.trim().is_empty() {
            return Err(ValidationError::MissingField("reason").into());
        }

        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        if request.status.is_final() {
            return Err(LoanServiceError::InvalidState {
                loan_id: loan_id.clone(),
                status: request.status,
                operation: "reject",
            });
        }

        self.scheduler.cancel(loan_id);

        let now = (self.clock)();
        request.status = LoanStatus::Rejected;
        request.terms = None;
        self.tracker
            .close_outstanding(&mut request, REVIEWER_CLOSED_NOTE, now);
        request.feedback = Some(reason.trim().to_string());
        request.updated_at = now;

        self.store.put(request.clone())?;
        info!(loan_id = %loan_id, "loan request rejected");
        self.notify("loan_rejected", &request);
        Ok(request)
    }

    /// Replace the feedback message shown to the borrower.
    pub fn post_feedback(
        &self,
        loan_id: &LoanRequestId,
        message: &str,
    ) -> Result<LoanRequest, LoanServiceError> {
        if message.trim().is_empty() {
            return Err(ValidationError::MissingField("message").into());
        }

        let lock = self.lock_for(loan_id)?;
        let _held = lock.lock().map_err(|_| lock_poisoned())?;

        let mut request = self.fetch(loan_id)?;
        request.feedback = Some(message.trim().to_string());
        request.updated_at = (self.clock)();
        self.store.put(request.clone())?;
        self.notify("feedback_posted", &request);
        Ok(request)
    }

    pub fn get(&self, loan_id: &LoanRequestId) -> Result<LoanRequest, LoanServiceError> {
        self.fetch(loan_id)
    }

    /// A borrower's requests, newest first.
    pub fn list_requests(
        &self,
        borrower: &BorrowerId,
    ) -> Result<Vec<LoanRequest>, LoanServiceError> {
        let mut requests = self.store.list(borrower)?;
        requests.sort_by(|a, b| {
            b.submitted_at
                .cmp(&a.submitted_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(requests)
    }

    pub fn list_actions(
        &self,
        loan_id: &LoanRequestId,
        filter: ActionFilter,
        sort: ActionSort,
    ) -> Result<Vec<PendingAction>, LoanServiceError> {
        let request = self.fetch(loan_id)?;
        Ok(self.tracker.list(&request, filter, sort))
    }

    pub fn list_outstanding(
        &self,
        loan_id: &LoanRequestId,
        sort: ActionSort,
    ) -> Result<Vec<PendingAction>, LoanServiceError> {
        let request = self.fetch(loan_id)?;
        Ok(self.tracker.outstanding(&request, sort))
    }

    pub fn action_summary(
        &self,
        loan_id: &LoanRequestId,
        now: DateTime<Utc>,
    ) -> Result<ActionSummary, LoanServiceError> {
        let request = self.fetch(loan_id)?;
        Ok(self.tracker.summary(&request, now))
    }

    pub fn is_evaluation_scheduled(&self, loan_id: &LoanRequestId) -> bool {
        self.scheduler.is_scheduled(loan_id)
    }

    /// Abort a pending evaluation. Returns whether one was pending.
    pub fn cancel_evaluation(&self, loan_id: &LoanRequestId) -> bool {
        self.scheduler.cancel(loan_id)
    }

    /// Abort every pending evaluation.
    pub fn shutdown(&self) -> usize {
        self.scheduler.shutdown()
    }

    fn fetch(&self, loan_id: &LoanRequestId) -> Result<LoanRequest, LoanServiceError> {
        self.store
            .get(loan_id)?
            .ok_or_else(|| LoanServiceError::LoanNotFound(loan_id.clone()))
    }

    /// Per-request lock, created only once the request is known to exist. Callers re-fetch
    /// under the lock.
    fn lock_for(&self, loan_id: &LoanRequestId) -> Result<Arc<Mutex<()>>, LoanServiceError> {
        self.fetch(loan_id)?;
        let mut locks = self.locks.lock().map_err(|_| lock_poisoned())?;
        Ok(Arc::clone(locks.entry(loan_id.clone()).or_default()))
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Publishing is best-effort: the mutation is already committed when this runs.
    fn notify(&self, template: &str, request: &LoanRequest) {
        let mut details = BTreeMap::new();
        details.insert("status".to_string(), request.status.label().to_string());
        if let Some(score) = request.score {
            details.insert("score".to_string(), score.to_string());
        }
        if let Some(terms) = request.terms {
            details.insert("rate".to_string(), format!("{:.1}", terms.rate));
            details.insert(
                "monthly_payment".to_string(),
                terms.monthly_payment.to_string(),
            );
        }
        if let Some(feedback) = &request.feedback {
            details.insert("message".to_string(), feedback.clone());
        }

        let published = self.notifier.publish(LoanNotification {
            template: template.to_string(),
            loan_id: request.id.clone(),
            borrower: request.borrower.clone(),
            details,
        });
        if let Err(err) = published {
            warn!(
                loan_id = %request.id,
                template,
                error = %err,
                "loan notification not delivered"
            );
        }
    }
}

fn ensure_action_exists(
    request: &LoanRequest,
    action_id: &ActionId,
) -> Result<(), LoanServiceError> {
    if request
        .pending_actions
        .iter()
        .any(|action| &action.id == action_id)
    {
        Ok(())
    } else {
        Err(LoanServiceError::ActionNotFound {
            loan_id: request.id.clone(),
            action_id: action_id.clone(),
        })
    }
}

/// Actions can only move while a request awaits the borrower.
fn ensure_actionable(
    request: &LoanRequest,
    operation: &'static str,
) -> Result<(), LoanServiceError> {
    match request.status {
        LoanStatus::ActionRequired | LoanStatus::Pending => Ok(()),
        status => Err(LoanServiceError::InvalidState {
            loan_id: request.id.clone(),
            status,
            operation,
        }),
    }
}

fn action_error(loan_id: &LoanRequestId, err: ActionError) -> LoanServiceError {
    match err {
        ActionError::NotFound(action_id) => LoanServiceError::ActionNotFound {
            loan_id: loan_id.clone(),
            action_id,
        },
        other => LoanServiceError::Action(other),
    }
}

fn lock_poisoned() -> LoanServiceError {
    LoanServiceError::Store(StoreError::Unavailable(
        "loan request lock poisoned".to_string(),
    ))
}

/// Error raised by the lifecycle service.
#[derive(Debug, thiserror::Error)]
pub enum LoanServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("loan request {0} not found")]
    LoanNotFound(LoanRequestId),
    #[error("action {action_id} not found on loan request {loan_id}")]
    ActionNotFound {
        loan_id: LoanRequestId,
        action_id: ActionId,
    },
    #[error("cannot {operation} while loan request {loan_id} is {status}")]
    InvalidState {
        loan_id: LoanRequestId,
        status: LoanStatus,
        operation: &'static str,
    },
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl LoanServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LoanServiceError::LoanNotFound(_)
                | LoanServiceError::ActionNotFound { .. }
                | LoanServiceError::Store(StoreError::NotFound)
        )
    }
}
