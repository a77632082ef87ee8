use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ActionId, ActionPriority, ActionType, LoanRequest, PendingAction};

pub const BANK_STATEMENTS: &str = "Bank Statements (3 months)";
pub const EMPLOYMENT_LETTER: &str = "Employment Letter";

/// Errors raised while mutating a request's actions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("action {0} not found")]
    NotFound(ActionId),
    #[error("action {0} does not accept document uploads")]
    NotDocumentRequest(ActionId),
}

/// Everything needed to open a new follow-up action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDraft {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub title: String,
    pub description: String,
    pub priority: ActionPriority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub required_documents: Option<Vec<String>>,
    #[serde(default)]
    pub admin_note: Option<String>,
}

/// Ordering applied when listing actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSort {
    /// High before medium before low; ties keep creation order.
    #[default]
    Priority,
    /// Earliest due date first; undated actions last.
    DueDate,
    /// Lexicographic by type label.
    Type,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl ActionFilter {
    fn admits(self, action: &PendingAction) -> bool {
        match self {
            ActionFilter::All => true,
            ActionFilter::Pending => !action.completed,
            ActionFilter::Completed => action.completed,
        }
    }
}

/// Result of a completion request; completing twice is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Completed,
    AlreadyCompleted,
}

/// Counts shown on the borrower's action center.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub pending: usize,
    pub overdue: usize,
    pub completed: usize,
}

/// Creates, completes, and lists the follow-up actions attached to a loan request.
///
/// Actions are never removed; completion is the only mutation and it is monotonic.
#[derive(Debug, Clone)]
pub struct ActionTracker {
    document_due_days: u32,
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self::new(5)
    }
}

impl ActionTracker {
    pub fn new(document_due_days: u32) -> Self {
        Self { document_due_days }
    }

    /// The document request opened when a score falls at or below the soft-approve line.
    pub fn document_request(&self, submitted_at: DateTime<Utc>) -> ActionDraft {
        ActionDraft {
            action_type: ActionType::DocumentUpload,
            title: "Upload supporting documents".to_string(),
            description: "Please upload your recent bank statements and an employment letter so \
                          we can verify your income."
                .to_string(),
            priority: ActionPriority::High,
            due_date: Some(submitted_at + Duration::days(i64::from(self.document_due_days))),
            required_documents: Some(vec![
                BANK_STATEMENTS.to_string(),
                EMPLOYMENT_LETTER.to_string(),
            ]),
            admin_note: None,
        }
    }

    pub fn create(&self, request: &mut LoanRequest, draft: ActionDraft) -> PendingAction {
        let id = ActionId(format!(
            "{}-act-{}",
            request.id,
            request.pending_actions.len() + 1
        ));
        let action = PendingAction {
            id,
            action_type: draft.action_type,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            due_date: draft.due_date,
            required_documents: draft.required_documents,
            admin_note: draft.admin_note,
            uploaded_documents: Vec::new(),
            completed: false,
            completed_at: None,
        };
        request.pending_actions.push(action.clone());
        action
    }

    pub fn complete(
        &self,
        request: &mut LoanRequest,
        action_id: &ActionId,
        now: DateTime<Utc>,
    ) -> Result<Completion, ActionError> {
        let action = find_mut(request, action_id)?;
        Ok(mark_completed(action, now))
    }

    /// Record an uploaded document against a document request and complete it.
    pub fn attach_document(
        &self,
        request: &mut LoanRequest,
        action_id: &ActionId,
        document_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Completion, ActionError> {
        let action = find_mut(request, action_id)?;
        if action.action_type != ActionType::DocumentUpload {
            return Err(ActionError::NotDocumentRequest(action_id.clone()));
        }
        if action.completed {
            return Ok(Completion::AlreadyCompleted);
        }
        action.uploaded_documents.push(document_name.to_string());
        Ok(mark_completed(action, now))
    }

    /// Close every outstanding action with a note. Used when a reviewer ends the request.
    pub fn close_outstanding(&self, request: &mut LoanRequest, note: &str, now: DateTime<Utc>) {
        for action in request.pending_actions.iter_mut().filter(|a| !a.completed) {
            action.admin_note = Some(note.to_string());
            mark_completed(action, now);
        }
    }

    pub fn list(
        &self,
        request: &LoanRequest,
        filter: ActionFilter,
        sort: ActionSort,
    ) -> Vec<PendingAction> {
        let mut actions: Vec<PendingAction> = request
            .pending_actions
            .iter()
            .filter(|action| filter.admits(action))
            .cloned()
            .collect();
        actions.sort_by(|a, b| compare(a, b, sort));
        actions
    }

    pub fn outstanding(&self, request: &LoanRequest, sort: ActionSort) -> Vec<PendingAction> {
        self.list(request, ActionFilter::Pending, sort)
    }

    pub fn summary(&self, request: &LoanRequest, now: DateTime<Utc>) -> ActionSummary {
        request
            .pending_actions
            .iter()
            .fold(ActionSummary::default(), |mut summary, action| {
                if action.completed {
                    summary.completed += 1;
                } else {
                    summary.pending += 1;
                    if action.is_overdue(now) {
                        summary.overdue += 1;
                    }
                }
                summary
            })
    }

    pub fn all_completed(&self, request: &LoanRequest) -> bool {
        request.pending_actions.iter().all(|action| action.completed)
    }
}

fn find_mut<'a>(
    request: &'a mut LoanRequest,
    action_id: &ActionId,
) -> Result<&'a mut PendingAction, ActionError> {
    request
        .pending_actions
        .iter_mut()
        .find(|action| &action.id == action_id)
        .ok_or_else(|| ActionError::NotFound(action_id.clone()))
}

fn mark_completed(action: &mut PendingAction, now: DateTime<Utc>) -> Completion {
    if action.completed {
        return Completion::AlreadyCompleted;
    }
    action.completed = true;
    action.completed_at = Some(now);
    Completion::Completed
}

fn compare(a: &PendingAction, b: &PendingAction, sort: ActionSort) -> Ordering {
    match sort {
        ActionSort::Priority => b.priority.rank().cmp(&a.priority.rank()),
        ActionSort::DueDate => match (a.due_date, b.due_date) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        ActionSort::Type => a.action_type.label().cmp(b.action_type.label()),
    }
}
