//! Concurrent phase runner.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, warn};
use thiserror::Error;
use tokio::task::JoinSet;

use crate::limiter::AdmissionLimiter;
use crate::task::{TaskError, TaskResult};

/// One failed task of a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Human-readable task identity (e.g. `update list 7 (customers)`).
    pub label: String,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

/// Aggregate of every failure in a phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} of {total} {phase} task(s) failed: {}", .failures.len(), join_failures(.failures))]
pub struct PhaseError {
    pub phase: String,
    pub total: usize,
    pub failures: Vec<TaskFailure>,
}

fn join_failures(failures: &[TaskFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Everything a finished phase produced.
#[derive(Debug)]
pub struct PhaseReport<T> {
    pub phase: String,
    pub succeeded: Vec<T>,
    pub failed: Vec<TaskFailure>,
}

impl<T> PhaseReport<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// The aggregate error, if any task failed.
    pub fn error(&self) -> Option<PhaseError> {
        if self.failed.is_empty() {
            return None;
        }
        Some(PhaseError {
            phase: self.phase.clone(),
            total: self.total(),
            failures: self.failed.clone(),
        })
    }

    /// Splits into successes and the aggregate error.
    pub fn into_parts(self) -> (Vec<T>, Option<PhaseError>) {
        let error = self.error();
        (self.succeeded, error)
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Runs `work` for every item concurrently, each behind a limiter token.
///
/// Returns once every task has finished. Failures never cancel siblings.
pub async fn run_phase<I, T, L, F, Fut>(
    limiter: &AdmissionLimiter,
    phase: &str,
    items: Vec<I>,
    label: L,
    work: F,
) -> PhaseReport<T>
where
    I: Send + 'static,
    T: Send + 'static,
    L: Fn(&I) -> String,
    F: Fn(I) -> Fut,
    Fut: Future<Output = TaskResult<T>> + Send + 'static,
{
    let succeeded: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::with_capacity(items.len())));
    let failed: Arc<Mutex<Vec<TaskFailure>>> = Arc::new(Mutex::new(Vec::new()));

    debug!("Starting {} phase with {} task(s)", phase, items.len());

    let mut tasks = JoinSet::new();
    for item in items {
        let task_label = label(&item);
        let fut = work(item);
        let limiter = limiter.clone();
        let succeeded = Arc::clone(&succeeded);
        let failed = Arc::clone(&failed);

        tasks.spawn(async move {
            let outcome = match limiter.acquire().await {
                Ok(()) => fut.await,
                Err(e) => Err(TaskError::internal(e.to_string())),
            };
            match outcome {
                Ok(value) => lock(&succeeded).push(value),
                Err(error) => {
                    warn!("{} failed: {}", task_label, error);
                    lock(&failed).push(TaskFailure {
                        label: task_label,
                        error,
                    });
                }
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(join_error) = joined {
            lock(&failed).push(TaskFailure {
                label: format!("{} task", phase),
                error: TaskError::internal(join_error.to_string()),
            });
        }
    }

    let succeeded = std::mem::take(&mut *lock(&succeeded));
    let failed = std::mem::take(&mut *lock(&failed));
    debug!(
        "Finished {} phase: {} succeeded, {} failed",
        phase,
        succeeded.len(),
        failed.len()
    );

    PhaseReport {
        phase: phase.to_string(),
        succeeded,
        failed,
    }
}
