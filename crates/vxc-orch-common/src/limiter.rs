//! Admission limiter for remote API calls.
//!
//! A token bucket with `burst` tokens. Taking a token is immediate while any
//! are left; each token spent returns to the bucket exactly one `period`
//! later. No window of length `period` can therefore contain more than
//! `burst` admissions, however the callers are scheduled.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Semaphore;

/// Error type for limiter operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LimiterError {
    #[error("Admission limiter closed")]
    Closed,
}

/// Token bucket shared by every task of one reconciliation call.
///
/// Cloning is cheap and yields a handle to the same bucket.
#[derive(Debug, Clone)]
pub struct AdmissionLimiter {
    tokens: Arc<Semaphore>,
    burst: usize,
    period: Duration,
}

impl AdmissionLimiter {
    /// Creates a limiter admitting at most `burst` calls per `period`.
    ///
    /// A burst of zero is raised to one so acquisition can always make
    /// progress.
    pub fn new(burst: usize, period: Duration) -> Self {
        let burst = burst.max(1);
        Self {
            tokens: Arc::new(Semaphore::new(burst)),
            burst,
            period,
        }
    }

    pub fn burst(&self) -> usize {
        self.burst
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tokens that can be taken right now without waiting.
    pub fn available(&self) -> usize {
        self.tokens.available_permits()
    }

    /// Waits for a token.
    ///
    /// The token is returned to the bucket one period after this call
    /// returns; callers never hand it back themselves.
    pub async fn acquire(&self) -> Result<(), LimiterError> {
        let permit = Arc::clone(&self.tokens)
            .acquire_owned()
            .await
            .map_err(|_| LimiterError::Closed)?;

        let period = self.period;
        tokio::spawn(async move {
            tokio::time::sleep(period).await;
            drop(permit);
        });
        Ok(())
    }
}
