use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{BorrowerId, LoanRequest, LoanRequestId};

/// Storage abstraction injected into the lifecycle service.
pub trait LoanRequestStore: Send + Sync {
    fn insert(&self, request: LoanRequest) -> Result<LoanRequest, StoreError>;
    /// Replace an existing record.
    fn put(&self, request: LoanRequest) -> Result<(), StoreError>;
    fn get(&self, id: &LoanRequestId) -> Result<Option<LoanRequest>, StoreError>;
    /// Every request submitted by a borrower, in no particular order.
    fn list(&self, borrower: &BorrowerId) -> Result<Vec<LoanRequest>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store backing the API binary, demos, and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoanRequestStore {
    records: Arc<Mutex<HashMap<LoanRequestId, LoanRequest>>>,
}

impl InMemoryLoanRequestStore {
    fn records(&self) -> Result<MutexGuard<'_, HashMap<LoanRequestId, LoanRequest>>, StoreError> {
        self.records
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    /// Drop a record outright. The lifecycle never calls this; operators purging test data do.
    pub fn remove(&self, id: &LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        Ok(self.records()?.remove(id))
    }

    pub fn len(&self) -> usize {
        self.records().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LoanRequestStore for InMemoryLoanRequestStore {
    fn insert(&self, request: LoanRequest) -> Result<LoanRequest, StoreError> {
        let mut records = self.records()?;
        if records.contains_key(&request.id) {
            return Err(StoreError::Conflict);
        }
        records.insert(request.id.clone(), request.clone());
        Ok(request)
    }

    fn put(&self, request: LoanRequest) -> Result<(), StoreError> {
        let mut records = self.records()?;
        match records.get_mut(&request.id) {
            Some(existing) => {
                *existing = request;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    fn get(&self, id: &LoanRequestId) -> Result<Option<LoanRequest>, StoreError> {
        Ok(self.records()?.get(id).cloned())
    }

    fn list(&self, borrower: &BorrowerId) -> Result<Vec<LoanRequest>, StoreError> {
        Ok(self
            .records()?
            .values()
            .filter(|request| &request.borrower == borrower)
            .cloned()
            .collect())
    }
}
