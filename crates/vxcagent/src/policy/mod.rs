//! Routing-policy lists of a virtual router and their synchronizer.

pub mod sync;
pub mod types;

pub use sync::{carry_ids, plan_sync, PolicyListSync, PolicySyncError, PolicySyncPlan, SyncOutcome};
pub use types::{validate_collection, PolicyEntry, RoutingPolicyList, MAX_ENTRIES, MIN_ENTRIES};
