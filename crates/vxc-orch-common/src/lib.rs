//! Reconciliation primitives shared by the circuit and router reconcilers.
//!
//! - [`TaskError`] / [`SyncOp`]: outcome and kind of one unit of remote work
//! - [`AdmissionLimiter`]: token bucket bounding the rate of remote calls
//! - [`run_phase`]: runs a batch of tasks concurrently behind a limiter and
//!   reports every success and failure
//!
//! # Execution model
//!
//! A reconciliation call that fans out (the routing-policy synchronizer)
//! creates one limiter and runs one or more phases against it:
//!
//! 1. Every task of a phase is spawned at once
//! 2. Each task waits for a limiter token before touching the remote API
//! 3. The phase returns only after every task finished (completion barrier)
//! 4. Failures are collected, never short-circuited; the caller decides
//!    what to keep
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use vxc_orch_common::{run_phase, AdmissionLimiter, TaskResult};
//!
//! let limiter = AdmissionLimiter::new(10, Duration::from_secs(1));
//! let report = run_phase(&limiter, "create", items, |item| item.name.clone(), |item| async move {
//!     api.create(&item).await.map_err(TaskError::from_remote)
//! })
//! .await;
//! ```

mod limiter;
mod phase;
mod task;

pub use limiter::{AdmissionLimiter, LimiterError};
pub use phase::{run_phase, PhaseError, PhaseReport, TaskFailure};
pub use task::{SyncOp, TaskError, TaskResult};
