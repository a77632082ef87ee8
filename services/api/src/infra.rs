use metrics_exporter_prometheus::PrometheusHandle;
use openlend::loans::{
    EvaluationEngine, InMemoryLoanRequestStore, LoanLifecycleService, LoanNotification,
    LoanNotifier, NotifyError,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

const RECENT_NOTIFICATIONS: usize = 64;

pub(crate) type ApiService = LoanLifecycleService<InMemoryLoanRequestStore, LoggingNotifier>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: EvaluationEngine,
}

/// Notifier that records borrower notifications in the service log and keeps the most
/// recent ones for the demo printout.
#[derive(Default, Clone)]
pub(crate) struct LoggingNotifier {
    recent: Arc<Mutex<Vec<LoanNotification>>>,
}

impl LoanNotifier for LoggingNotifier {
    fn publish(&self, notification: LoanNotification) -> Result<(), NotifyError> {
        info!(
            template = %notification.template,
            loan_id = %notification.loan_id,
            borrower = %notification.borrower,
            "borrower notification"
        );
        let mut guard = self
            .recent
            .lock()
            .map_err(|_| NotifyError::Transport("notification log poisoned".to_string()))?;
        if guard.len() == RECENT_NOTIFICATIONS {
            guard.remove(0);
        }
        guard.push(notification);
        Ok(())
    }
}

impl LoggingNotifier {
    pub(crate) fn drain(&self) -> Vec<LoanNotification> {
        self.recent
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default()
    }
}
