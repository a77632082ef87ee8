use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evaluation::ScoreComponent;

/// Identifier wrapper for loan requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanRequestId(pub String);

impl fmt::Display for LoanRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Borrower identity, keyed by the applicant's normalized e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BorrowerId(pub String);

impl BorrowerId {
    pub fn from_email(email: &str) -> Self {
        Self(email.trim().to_ascii_lowercase())
    }
}

impl fmt::Display for BorrowerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a follow-up action, unique within its loan request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentStatus {
    FullTime,
    PartTime,
    SelfEmployed,
    Freelancer,
    Student,
    Unemployed,
}

impl EmploymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            EmploymentStatus::FullTime => "full-time",
            EmploymentStatus::PartTime => "part-time",
            EmploymentStatus::SelfEmployed => "self-employed",
            EmploymentStatus::Freelancer => "freelancer",
            EmploymentStatus::Student => "student",
            EmploymentStatus::Unemployed => "unemployed",
        }
    }
}

impl FromStr for EmploymentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "full-time" => Ok(Self::FullTime),
            "part-time" => Ok(Self::PartTime),
            "self-employed" => Ok(Self::SelfEmployed),
            "freelancer" => Ok(Self::Freelancer),
            "student" => Ok(Self::Student),
            "unemployed" => Ok(Self::Unemployed),
            other => Err(other.to_string()),
        }
    }
}

/// Repayment horizons offered on the application form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum LoanDuration {
    Months6,
    Months12,
    Months18,
    Months24,
    Months36,
}

impl LoanDuration {
    pub const fn months(self) -> u32 {
        match self {
            LoanDuration::Months6 => 6,
            LoanDuration::Months12 => 12,
            LoanDuration::Months18 => 18,
            LoanDuration::Months24 => 24,
            LoanDuration::Months36 => 36,
        }
    }
}

impl Default for LoanDuration {
    fn default() -> Self {
        LoanDuration::Months12
    }
}

impl TryFrom<u32> for LoanDuration {
    type Error = String;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            6 => Ok(Self::Months6),
            12 => Ok(Self::Months12),
            18 => Ok(Self::Months18),
            24 => Ok(Self::Months24),
            36 => Ok(Self::Months36),
            other => Err(format!("{other} months is not an offered duration")),
        }
    }
}

impl From<LoanDuration> for u32 {
    fn from(value: LoanDuration) -> Self {
        value.months()
    }
}

/// Applicant-submitted data for one loan request. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub amount: f64,
    pub duration: LoanDuration,
    pub reason: String,
    pub employment: EmploymentStatus,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
    #[serde(default)]
    pub total_assets: f64,
    #[serde(default)]
    pub existing_debts: f64,
    #[serde(default)]
    pub business_plan: String,
}

impl ApplicationInput {
    pub fn borrower_id(&self) -> BorrowerId {
        BorrowerId::from_email(&self.email)
    }
}

/// The application form exactly as the borrower typed it: every field is free text.
///
/// [`IntakeGuard::admit`](super::intake::IntakeGuard::admit) turns this into an
/// [`ApplicationInput`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub amount: String,
    pub reason: String,
    pub duration: String,
    pub employment: String,
    pub income: String,
    pub expenses: String,
    pub assets: String,
    pub debts: String,
    pub business_plan: String,
}

/// Lifecycle status of a loan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Submitted,
    Reviewing,
    Approved,
    Pending,
    ActionRequired,
    Rejected,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            LoanStatus::Submitted => "submitted",
            LoanStatus::Reviewing => "reviewing",
            LoanStatus::Approved => "approved",
            LoanStatus::Pending => "pending",
            LoanStatus::ActionRequired => "action_required",
            LoanStatus::Rejected => "rejected",
        }
    }

    /// Statuses that may carry quoted terms.
    pub const fn carries_terms(self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Pending)
    }

    pub const fn is_final(self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Rejected)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Quoted repayment terms. Flat-fee approximations, not an amortization schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Annual rate in percent (e.g. `3.8`).
    pub rate: f64,
    /// Whole currency units. Amounts too large for `u64` quote `u64::MAX`.
    pub monthly_payment: u64,
    pub total_interest: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    DocumentUpload,
    Verification,
    Clarification,
    Review,
}

impl ActionType {
    pub const fn label(self) -> &'static str {
        match self {
            ActionType::DocumentUpload => "document_upload",
            ActionType::Verification => "verification",
            ActionType::Clarification => "clarification",
            ActionType::Review => "review",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

impl ActionPriority {
    pub const fn rank(self) -> u8 {
        match self {
            ActionPriority::High => 3,
            ActionPriority::Medium => 2,
            ActionPriority::Low => 1,
        }
    }
}

/// Follow-up required from the borrower before a decision can finalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub title: String,
    pub description: String,
    pub priority: ActionPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_documents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uploaded_documents: Vec<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PendingAction {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

/// The persistent record derived from an [`ApplicationInput`] plus engine output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub id: LoanRequestId,
    pub borrower: BorrowerId,
    pub amount: f64,
    pub duration: LoanDuration,
    pub reason: String,
    pub status: LoanStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub score_components: Vec<ScoreComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<LoanTerms>,
    pub strength_factors: Vec<String>,
    pub risk_factors: Vec<String>,
    pub pending_actions: Vec<PendingAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoanRequest {
    pub fn outstanding_actions(&self) -> impl Iterator<Item = &PendingAction> {
        self.pending_actions.iter().filter(|action| !action.completed)
    }

    pub fn status_view(&self) -> LoanStatusView {
        LoanStatusView {
            loan_id: self.id.clone(),
            status: self.status.label(),
            score: self.score,
            rate: self.terms.map(|terms| terms.rate),
            monthly_payment: self.terms.map(|terms| terms.monthly_payment),
            outstanding_actions: self.outstanding_actions().count(),
            feedback: self.feedback.clone(),
        }
    }
}

/// Read-only snapshot handed to presentation collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct LoanStatusView {
    pub loan_id: LoanRequestId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<u64>,
    pub outstanding_actions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}
