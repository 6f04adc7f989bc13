//! Routing-policy list synchronizer.
//!
//! Diffs the desired lists of one router against the previously tracked
//! ones and executes the difference in two phases, each behind one shared
//! admission limiter:
//!
//! 1. creates and updates, concurrently;
//! 2. deletes, once every task of phase 1 has finished.
//!
//! Failures are collected, never rolled back. The returned collection
//! reflects what the service holds afterwards, so the next cycle re-diffs
//! and retries only what is still missing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use vxc_api::{ApiError, FabricApi, PolicyListId, RouterUid};
use vxc_orch_common::{run_phase, AdmissionLimiter, PhaseError, SyncOp, TaskError, TaskResult};

use super::types::{validate_collection, RoutingPolicyList};
use crate::audit::{AuditCategory, AuditRecord};
use crate::config::LimiterConfig;
use crate::error::ValidationError;
use crate::{audit_log, debug_log, info_log, warn_log};

/// Error type for a synchronization cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicySyncError {
    #[error("invalid routing-policy lists: {0}")]
    Validation(#[from] ValidationError),

    /// Some tasks failed; the others took effect.
    #[error("routing-policy list sync: {0}")]
    PartialBatch(PhaseError),

    #[error("routing-policy list sync: {0}")]
    Remote(#[from] ApiError),
}

/// What a cycle has to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PolicySyncPlan {
    /// New lists, without ids.
    pub creates: Vec<RoutingPolicyList>,
    /// Desired content of changed lists, with ids.
    pub updates: Vec<RoutingPolicyList>,
    /// Previous lists no longer desired.
    pub deletes: Vec<RoutingPolicyList>,
    #[serde(skip)]
    pub unchanged: Vec<RoutingPolicyList>,
}

impl PolicySyncPlan {
    /// Returns true if the cycle sends nothing.
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Partitions the desired lists against the previous ones by id.
///
/// A desired list carrying an id the previous collection does not know is
/// created anew.
pub fn plan_sync(previous: &[RoutingPolicyList], desired: &[RoutingPolicyList]) -> PolicySyncPlan {
    let by_id: HashMap<PolicyListId, &RoutingPolicyList> = previous
        .iter()
        .filter_map(|l| l.id.map(|id| (id, l)))
        .collect();

    let mut plan = PolicySyncPlan::default();
    let mut kept = HashSet::new();
    for list in desired {
        match list.id.and_then(|id| by_id.get(&id).map(|prev| (id, prev))) {
            Some((id, prev)) => {
                kept.insert(id);
                if prev.same_content(list) {
                    plan.unchanged.push(list.clone());
                } else {
                    plan.updates.push(list.clone());
                }
            }
            None => {
                if let Some(id) = list.id {
                    warn_log!(
                        "PolicyListSync",
                        list_id = id,
                        description = %list.description,
                        "list id is not tracked, creating it anew"
                    );
                }
                let mut create = list.clone();
                create.id = None;
                plan.creates.push(create);
            }
        }
    }
    plan.deletes = previous
        .iter()
        .filter(|l| l.id.is_some_and(|id| !kept.contains(&id)))
        .cloned()
        .collect();
    plan
}

/// Gives desired lists without an id the id of the previous list with the
/// same description.
///
/// Declarative documents name lists by description; this lets the diff
/// match them across cycles instead of recreating them.
pub fn carry_ids(previous: &[RoutingPolicyList], desired: &mut [RoutingPolicyList]) {
    let by_description: HashMap<&str, PolicyListId> = previous
        .iter()
        .filter_map(|l| l.id.map(|id| (l.description.as_str(), id)))
        .collect();
    for list in desired.iter_mut().filter(|l| l.id.is_none()) {
        list.id = by_description.get(list.description.as_str()).copied();
    }
}

/// Result of [`PolicyListSync::sync`]: the collection as it now stands and
/// the error, if any part of the cycle failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub collection: Vec<RoutingPolicyList>,
    pub error: Option<PolicySyncError>,
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<Vec<RoutingPolicyList>, PolicySyncError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.collection),
        }
    }
}

enum Upsert {
    Create(RoutingPolicyList),
    Update(RoutingPolicyList),
}

impl Upsert {
    fn label(&self) -> String {
        match self {
            Upsert::Create(l) => format!("create list '{}'", l.description),
            Upsert::Update(l) => format!(
                "update list {} ('{}')",
                l.id.unwrap_or_default(),
                l.description
            ),
        }
    }
}

/// Synchronizes the routing-policy lists of one router.
#[derive(Clone)]
pub struct PolicyListSync {
    api: Arc<dyn FabricApi>,
    router: RouterUid,
    limiter: LimiterConfig,
    correlation_id: Option<String>,
}

impl std::fmt::Debug for PolicyListSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyListSync")
            .field("router", &self.router)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl PolicyListSync {
    pub fn new(api: Arc<dyn FabricApi>, router: RouterUid, limiter: LimiterConfig) -> Self {
        Self {
            api,
            router,
            limiter,
            correlation_id: None,
        }
    }

    /// Tags every audit record of this synchronizer.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn router(&self) -> &RouterUid {
        &self.router
    }

    /// Reads every list of the router.
    pub async fn fetch(&self) -> Result<Vec<RoutingPolicyList>, PolicySyncError> {
        let summaries = self.api.list_policy_lists(&self.router).await?;
        let mut lists = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let payload = self.api.get_policy_list(&self.router, summary.id).await?;
            let mut list = RoutingPolicyList::from_payload(&payload)?;
            list.id = Some(summary.id);
            lists.push(list);
        }
        Ok(lists)
    }

    fn audit(&self, record: AuditRecord) -> AuditRecord {
        match &self.correlation_id {
            Some(id) => record.with_correlation_id(id.clone()),
            None => record,
        }
    }

    /// Runs one synchronization cycle.
    pub async fn sync(
        &self,
        previous: &[RoutingPolicyList],
        desired: &[RoutingPolicyList],
    ) -> SyncOutcome {
        if let Err(e) = validate_collection(desired) {
            warn_log!("PolicyListSync", router = %self.router, error = %e, "rejected desired lists");
            return SyncOutcome {
                collection: previous.to_vec(),
                error: Some(e.into()),
            };
        }

        let plan = plan_sync(previous, desired);
        if plan.is_empty() {
            debug_log!("PolicyListSync", router = %self.router, "routing-policy lists in sync");
            return SyncOutcome {
                collection: assemble(previous, desired, &[], &HashSet::new(), &HashSet::new()),
                error: None,
            };
        }
        info_log!(
            "PolicyListSync",
            router = %self.router,
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            deletes = plan.deletes.len(),
            "synchronizing routing-policy lists"
        );

        let limiter = AdmissionLimiter::new(self.limiter.burst, self.limiter.period());

        let upserts: Vec<Upsert> = plan
            .creates
            .iter()
            .cloned()
            .map(Upsert::Create)
            .chain(plan.updates.iter().cloned().map(Upsert::Update))
            .collect();
        let upsert_report = run_phase(&limiter, "create/update", upserts, Upsert::label, |item| {
            let this = self.clone();
            async move { this.upsert(item).await }
        })
        .await;

        let delete_report = run_phase(
            &limiter,
            "delete",
            plan.deletes.clone(),
            |l: &RoutingPolicyList| {
                format!(
                    "delete list {} ('{}')",
                    l.id.unwrap_or_default(),
                    l.description
                )
            },
            |list| {
                let this = self.clone();
                async move { this.delete(list).await }
            },
        )
        .await;

        let (upserted, upsert_error) = upsert_report.into_parts();
        let (deleted, delete_error) = delete_report.into_parts();

        let created: Vec<RoutingPolicyList> = upserted
            .iter()
            .filter(|(op, _)| *op == SyncOp::Create)
            .map(|(_, l)| l.clone())
            .collect();
        let updated: HashSet<PolicyListId> = upserted
            .iter()
            .filter(|(op, _)| *op == SyncOp::Update)
            .filter_map(|(_, l)| l.id)
            .collect();
        let deleted: HashSet<PolicyListId> = deleted.into_iter().collect();

        SyncOutcome {
            collection: assemble(previous, desired, &created, &updated, &deleted),
            error: merge_errors(upsert_error, delete_error).map(PolicySyncError::PartialBatch),
        }
    }

    async fn upsert(&self, item: Upsert) -> TaskResult<(SyncOp, RoutingPolicyList)> {
        match item {
            Upsert::Create(mut list) => {
                let result = self
                    .api
                    .create_policy_list(&self.router, &list.to_payload())
                    .await;
                audit_log!(self
                    .audit(AuditRecord::new(
                        AuditCategory::ResourceCreate,
                        "PolicyListSync",
                        "create_policy_list"
                    ))
                    .with_result(&result)
                    .with_object_id(format!("{}/{}", self.router, list.description))
                    .with_object_type("routing_policy_list")
                    .with_details(serde_json::json!({
                        "id": result.as_ref().ok().and_then(|p| p.id),
                        "entries": list.entries.len(),
                    })));
                let created = result.map_err(TaskError::from_remote)?;
                let id = created
                    .id
                    .ok_or_else(|| TaskError::from_remote("service returned no list id"))?;
                list.id = Some(id);
                Ok((SyncOp::Create, list))
            }
            Upsert::Update(list) => {
                let id = list
                    .id
                    .ok_or_else(|| TaskError::internal("update without list id"))?;
                let result = self
                    .api
                    .update_policy_list(&self.router, id, &list.to_payload())
                    .await;
                audit_log!(self
                    .audit(AuditRecord::new(
                        AuditCategory::ResourceModify,
                        "PolicyListSync",
                        "update_policy_list"
                    ))
                    .with_result(&result)
                    .with_object_id(format!("{}/{}", self.router, id))
                    .with_object_type("routing_policy_list")
                    .with_details(serde_json::json!({
                        "description": list.description,
                        "entries": list.entries.len(),
                    })));
                result.map_err(TaskError::from_remote)?;
                Ok((SyncOp::Update, list))
            }
        }
    }

    async fn delete(&self, list: RoutingPolicyList) -> TaskResult<PolicyListId> {
        let id = list
            .id
            .ok_or_else(|| TaskError::internal("delete without list id"))?;
        let result = match self.api.delete_policy_list(&self.router, id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        };
        audit_log!(self
            .audit(AuditRecord::new(
                AuditCategory::ResourceDelete,
                "PolicyListSync",
                "delete_policy_list"
            ))
            .with_result(&result)
            .with_object_id(format!("{}/{}", self.router, id))
            .with_object_type("routing_policy_list"));
        result.map_err(TaskError::from_remote)?;
        Ok(id)
    }
}

/// Builds the post-cycle collection in desired order.
///
/// A failed update keeps the previous version, a failed create is absent,
/// and a failed delete is kept at the end because the list still exists.
fn assemble(
    previous: &[RoutingPolicyList],
    desired: &[RoutingPolicyList],
    created: &[RoutingPolicyList],
    updated: &HashSet<PolicyListId>,
    deleted: &HashSet<PolicyListId>,
) -> Vec<RoutingPolicyList> {
    let by_id: HashMap<PolicyListId, &RoutingPolicyList> = previous
        .iter()
        .filter_map(|l| l.id.map(|id| (id, l)))
        .collect();
    let created: HashMap<&str, &RoutingPolicyList> = created
        .iter()
        .map(|l| (l.description.as_str(), l))
        .collect();

    let mut kept = HashSet::new();
    let mut collection = Vec::with_capacity(desired.len());
    for list in desired {
        match list.id.and_then(|id| by_id.get(&id).map(|prev| (id, *prev))) {
            Some((id, prev)) => {
                kept.insert(id);
                if prev.same_content(list) || updated.contains(&id) {
                    collection.push(list.clone());
                } else {
                    collection.push(prev.clone());
                }
            }
            None => {
                if let Some(list) = created.get(list.description.as_str()) {
                    collection.push((*list).clone());
                }
            }
        }
    }
    collection.extend(
        previous
            .iter()
            .filter(|l| l.id.is_some_and(|id| !kept.contains(&id) && !deleted.contains(&id)))
            .cloned(),
    );
    collection
}

fn merge_errors(first: Option<PhaseError>, second: Option<PhaseError>) -> Option<PhaseError> {
    match (first, second) {
        (None, None) => None,
        (Some(e), None) | (None, Some(e)) => Some(e),
        (Some(a), Some(b)) => Some(PhaseError {
            phase: format!("{} and {}", a.phase, b.phase),
            total: a.total + b.total,
            failures: a.failures.into_iter().chain(b.failures).collect(),
        }),
    }
}
