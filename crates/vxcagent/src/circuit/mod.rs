//! Virtual circuits: declarative state, classification, endpoint
//! reconciliation and orchestration against the provisioning API.

pub mod classify;
pub mod endpoint;
pub mod orch;
pub mod types;

pub use classify::{classify, validate_endpoint, FieldRule, FieldRules};
pub use endpoint::{
    reconcile, reconcile_endpoint, CircuitPlan, EndpointInput, EndpointOperation, EndpointPlan,
    EndpointState, FieldChanges,
};
pub use orch::{CircuitOrch, CircuitOrchError, CircuitOrchStats, UpdateOutcome};
pub use types::{Circuit, Endpoint, Side, VALID_TERMS};
