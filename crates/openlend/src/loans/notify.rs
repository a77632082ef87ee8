use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{BorrowerId, LoanRequestId};

/// Outbound hook for status updates (notification panel, e-mail, push).
pub trait LoanNotifier: Send + Sync {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanNotification {
    pub template: String,
    pub loan_id: LoanRequestId,
    pub borrower: BorrowerId,
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
