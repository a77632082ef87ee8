use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

use super::domain::LoanRequestId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("no async runtime available to schedule evaluation")]
    NoRuntime,
    #[error("scheduler state unavailable")]
    Poisoned,
}

struct Timer {
    generation: u64,
    abort: AbortHandle,
}

type Timers = Arc<Mutex<HashMap<LoanRequestId, Timer>>>;

/// Owns the delayed evaluation timers, one per loan request.
///
/// The job handed to [`EvaluationScheduler::schedule`] is the seam where a remote underwriting
/// call (with its own retry policy) would plug in.
pub struct EvaluationScheduler {
    delay: Duration,
    timers: Timers,
    generation: AtomicU64,
}

impl EvaluationScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(1),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `job` once the delay elapses. A loan with a live timer keeps it and gets a handle
    /// to the existing one.
    pub fn schedule<F>(
        &self,
        loan_id: LoanRequestId,
        job: F,
    ) -> Result<EvaluationHandle, SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let mut timers = lock(&self.timers)?;

        if let Some(existing) = timers.get(&loan_id) {
            if !existing.abort.is_finished() {
                debug!(loan_id = %loan_id, "evaluation already scheduled");
                return Ok(EvaluationHandle {
                    loan_id,
                    generation: existing.generation,
                    abort: existing.abort.clone(),
                    timers: Arc::clone(&self.timers),
                });
            }
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let task_timers = Arc::clone(&self.timers);
        let task_loan = loan_id.clone();

        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            release(&task_timers, &task_loan, generation);
            job();
        });
        let abort = task.abort_handle();

        timers.insert(
            loan_id.clone(),
            Timer {
                generation,
                abort: abort.clone(),
            },
        );
        debug!(loan_id = %loan_id, delay_ms = delay.as_millis() as u64, "evaluation scheduled");

        Ok(EvaluationHandle {
            loan_id,
            generation,
            abort,
            timers: Arc::clone(&self.timers),
        })
    }

    /// Abort the pending timer for a loan. Returns whether one was pending.
    pub fn cancel(&self, loan_id: &LoanRequestId) -> bool {
        let Ok(mut timers) = lock(&self.timers) else {
            return false;
        };
        match timers.remove(loan_id) {
            Some(timer) => {
                let pending = !timer.abort.is_finished();
                timer.abort.abort();
                debug!(loan_id = %loan_id, pending, "evaluation cancelled");
                pending
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, loan_id: &LoanRequestId) -> bool {
        lock(&self.timers)
            .map(|timers| {
                timers
                    .get(loan_id)
                    .map(|timer| !timer.abort.is_finished())
                    .unwrap_or(false)
            })
            .unwrap_or(false)
    }

    /// Abort every pending timer. Returns how many were aborted.
    pub fn shutdown(&self) -> usize {
        let Ok(mut timers) = lock(&self.timers) else {
            return 0;
        };
        let count = timers.len();
        for (_, timer) in timers.drain() {
            timer.abort.abort();
        }
        if count > 0 {
            debug!(count, "pending evaluations aborted");
        }
        count
    }
}

impl Drop for EvaluationScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Cancellable handle to a scheduled evaluation.
#[derive(Clone)]
pub struct EvaluationHandle {
    loan_id: LoanRequestId,
    generation: u64,
    abort: AbortHandle,
    timers: Timers,
}

impl EvaluationHandle {
    pub fn loan_id(&self) -> &LoanRequestId {
        &self.loan_id
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }

    /// Abort this evaluation if it has not fired yet.
    pub fn cancel(&self) {
        self.abort.abort();
        release(&self.timers, &self.loan_id, self.generation);
    }
}

impl std::fmt::Debug for EvaluationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationHandle")
            .field("loan_id", &self.loan_id)
            .field("generation", &self.generation)
            .finish()
    }
}

fn lock(timers: &Timers) -> Result<MutexGuard<'_, HashMap<LoanRequestId, Timer>>, SchedulerError> {
    timers.lock().map_err(|_| SchedulerError::Poisoned)
}

fn release(timers: &Timers, loan_id: &LoanRequestId, generation: u64) {
    if let Ok(mut timers) = timers.lock() {
        if timers
            .get(loan_id)
            .map(|timer| timer.generation == generation)
            .unwrap_or(false)
        {
            timers.remove(loan_id);
        }
    }
}
