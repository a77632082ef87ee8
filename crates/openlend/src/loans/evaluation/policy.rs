use serde::{Deserialize, Serialize};

use super::super::domain::{LoanDuration, LoanStatus, LoanTerms};
use super::config::EvaluationConfig;
use super::terms::quote;

/// Outcome of the delayed evaluation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum EvaluationDecision {
    Approve { terms: LoanTerms },
    SoftApprove { terms: LoanTerms },
    RequestDocuments,
}

impl EvaluationDecision {
    pub fn status(&self) -> LoanStatus {
        match self {
            EvaluationDecision::Approve { .. } => LoanStatus::Approved,
            EvaluationDecision::SoftApprove { .. } => LoanStatus::Pending,
            EvaluationDecision::RequestDocuments => LoanStatus::ActionRequired,
        }
    }

    pub fn terms(&self) -> Option<LoanTerms> {
        match self {
            EvaluationDecision::Approve { terms } | EvaluationDecision::SoftApprove { terms } => {
                Some(*terms)
            }
            EvaluationDecision::RequestDocuments => None,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            EvaluationDecision::Approve { terms } => format!(
                "Congratulations! Your loan is approved at {:.1}% with monthly payments of ${}.",
                terms.rate, terms.monthly_payment
            ),
            EvaluationDecision::SoftApprove { terms } => format!(
                "Your application is pre-approved at {:.1}% pending final review.",
                terms.rate
            ),
            EvaluationDecision::RequestDocuments => {
                "Additional documents are required before we can finalize your application."
                    .to_string()
            }
        }
    }
}

pub(crate) fn decide_outcome(
    score: u8,
    amount: f64,
    duration: LoanDuration,
    config: &EvaluationConfig,
) -> EvaluationDecision {
    match quote(score, amount, duration, config) {
        Some(terms) if score > config.auto_approve_above => EvaluationDecision::Approve { terms },
        Some(terms) => EvaluationDecision::SoftApprove { terms },
        None => EvaluationDecision::RequestDocuments,
    }
}
