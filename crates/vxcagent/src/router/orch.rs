//! RouterOrch implementation.
//!
//! Manages a virtual router and runs the routing-policy list synchronizer
//! on every create, read and update.

use std::sync::Arc;

use vxc_api::api::{ProvisioningStatus, RouterInfo};
use vxc_api::{ApiError, FabricApi, RouterUid};

use super::types::VirtualRouter;
use crate::audit::{AuditCategory, AuditRecord};
use crate::config::{LimiterConfig, ProvisioningConfig};
use crate::error::ValidationError;
use crate::policy::{carry_ids, PolicyListSync, PolicySyncError, RoutingPolicyList};
use crate::{audit_log, debug_log, info_log};

/// Error type for virtual router operations.
#[derive(Debug, thiserror::Error)]
pub enum RouterOrchError {
    #[error("invalid router: {0}")]
    Validation(#[from] ValidationError),

    #[error("remote call failed: {0}")]
    Remote(#[source] ApiError),

    #[error("router not found: {0}")]
    NotFound(String),

    #[error("router {uid} not ready after {polls} poll(s), last status {status}")]
    ProvisioningTimeout {
        uid: String,
        polls: u32,
        status: ProvisioningStatus,
    },

    /// The router call succeeded but its lists are only partly in sync.
    /// `router` is the state to track.
    #[error("router {}: {source}", .router.id.as_deref().unwrap_or("<new>"))]
    PolicySync {
        router: Box<VirtualRouter>,
        #[source]
        source: PolicySyncError,
    },
}

impl From<ApiError> for RouterOrchError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound { resource, uid } => {
                RouterOrchError::NotFound(format!("{} {}", resource, uid))
            }
            other => RouterOrchError::Remote(other),
        }
    }
}

/// Statistics for RouterOrch operations.
#[derive(Debug, Clone, Default)]
pub struct RouterOrchStats {
    pub routers_created: u64,
    pub routers_updated: u64,
    pub routers_deleted: u64,
    pub list_sync_failures: u64,
}

/// RouterOrch - reconciles virtual routers and their policy lists.
pub struct RouterOrch {
    api: Arc<dyn FabricApi>,
    limiter: LimiterConfig,
    provisioning: ProvisioningConfig,
    stats: RouterOrchStats,
}

impl std::fmt::Debug for RouterOrch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterOrch")
            .field("limiter", &self.limiter)
            .field("provisioning", &self.provisioning)
            .field("stats", &self.stats)
            .finish()
    }
}

impl RouterOrch {
    pub fn new(
        api: Arc<dyn FabricApi>,
        limiter: LimiterConfig,
        provisioning: ProvisioningConfig,
    ) -> Self {
        Self {
            api,
            limiter,
            provisioning,
            stats: RouterOrchStats::default(),
        }
    }

    pub fn stats(&self) -> &RouterOrchStats {
        &self.stats
    }

    fn lists(&self, uid: &RouterUid, correlation: &str) -> PolicyListSync {
        PolicyListSync::new(self.api.clone(), uid.clone(), self.limiter.clone())
            .with_correlation_id(correlation)
    }

    /// Orders a router, then creates its lists.
    pub async fn create(&mut self, desired: &VirtualRouter) -> Result<VirtualRouter, RouterOrchError> {
        let correlation = uuid::Uuid::new_v4().to_string();
        desired.validate()?;

        let result = self.api.create_router(&desired.create_request()).await;
        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "RouterOrch", "create_router")
                .with_result(&result)
                .with_object_id(
                    result
                        .as_ref()
                        .map(|uid| uid.to_string())
                        .unwrap_or_else(|_| desired.name.clone())
                )
                .with_object_type("virtual_router")
                .with_correlation_id(correlation.clone())
                .with_details(serde_json::json!({
                    "location_id": desired.location_id,
                    "speed_mbps": desired.speed_mbps,
                    "prefix_lists": desired.prefix_lists.len(),
                }))
        );
        let uid = result?;
        self.stats.routers_created += 1;

        let info = self.await_ready(&uid).await?;
        let outcome = self
            .lists(&uid, &correlation)
            .sync(&[], &desired.prefix_lists)
            .await;
        self.finish(VirtualRouter::from_remote(&info, outcome.collection), outcome.error)
    }

    /// Reads the router and rebuilds its lists from the service. `Ok(None)`
    /// means the router is gone.
    pub async fn read(
        &mut self,
        tracked: &VirtualRouter,
    ) -> Result<Option<VirtualRouter>, RouterOrchError> {
        let Some(id) = tracked.id.as_deref() else {
            return Ok(None);
        };
        let uid = RouterUid::new(id);

        let info = match self.api.get_router(&uid).await {
            Ok(info) if info.provisioning_status.is_gone() => None,
            Ok(info) => Some(info),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        let Some(info) = info else {
            info_log!("RouterOrch", router = %uid, "router is gone, dropping");
            return Ok(None);
        };

        let correlation = uuid::Uuid::new_v4().to_string();
        let remote = self
            .lists(&uid, &correlation)
            .fetch()
            .await
            .map_err(|source| RouterOrchError::PolicySync {
                router: Box::new(tracked.clone()),
                source,
            })?;
        Ok(Some(VirtualRouter::from_remote(
            &info,
            in_tracked_order(&tracked.prefix_lists, remote),
        )))
    }

    /// Applies attribute changes, then synchronizes the lists.
    pub async fn update(
        &mut self,
        previous: &VirtualRouter,
        desired: &VirtualRouter,
    ) -> Result<VirtualRouter, RouterOrchError> {
        let correlation = uuid::Uuid::new_v4().to_string();
        let id = previous
            .id
            .clone()
            .ok_or_else(|| RouterOrchError::NotFound(format!("untracked router {}", previous.name)))?;
        let uid = RouterUid::new(id.as_str());

        desired.validate()?;
        let request = previous.update_request(desired)?;
        let mut lists = desired.prefix_lists.clone();
        carry_ids(&previous.prefix_lists, &mut lists);

        if request.is_empty() {
            debug_log!("RouterOrch", router = %uid, "router attributes unchanged");
        } else {
            let result = self.api.update_router(&uid, &request).await;
            audit_log!(
                AuditRecord::new(AuditCategory::ResourceModify, "RouterOrch", "update_router")
                    .with_result(&result)
                    .with_object_id(id.clone())
                    .with_object_type("virtual_router")
                    .with_correlation_id(correlation.clone())
                    .with_details(serde_json::json!({
                        "name": request.name,
                        "cost_centre": request.cost_centre,
                        "term_months": request.term_months,
                    }))
            );
            result?;
            self.stats.routers_updated += 1;
        }

        let info = self.await_ready(&uid).await?;
        let outcome = self
            .lists(&uid, &correlation)
            .sync(&previous.prefix_lists, &lists)
            .await;
        self.finish(VirtualRouter::from_remote(&info, outcome.collection), outcome.error)
    }

    /// Deletes the router. A router that is already gone counts as deleted.
    pub async fn delete(&mut self, tracked: &VirtualRouter) -> Result<(), RouterOrchError> {
        let Some(id) = tracked.id.as_deref() else {
            return Ok(());
        };
        let uid = RouterUid::new(id);

        let result = match self.api.delete_router(&uid).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        };
        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "RouterOrch", "delete_router")
                .with_result(&result)
                .with_object_id(id)
                .with_object_type("virtual_router")
                .with_correlation_id(uuid::Uuid::new_v4().to_string())
        );
        result?;
        self.stats.routers_deleted += 1;
        Ok(())
    }

    fn finish(
        &mut self,
        router: VirtualRouter,
        error: Option<PolicySyncError>,
    ) -> Result<VirtualRouter, RouterOrchError> {
        match error {
            None => Ok(router),
            Some(source) => {
                self.stats.list_sync_failures += 1;
                Err(RouterOrchError::PolicySync {
                    router: Box::new(router),
                    source,
                })
            }
        }
    }

    async fn await_ready(&self, uid: &RouterUid) -> Result<RouterInfo, RouterOrchError> {
        let mut last = ProvisioningStatus::Unknown;
        for poll in 1..=self.provisioning.max_polls {
            let info = self.api.get_router(uid).await?;
            if info.provisioning_status.is_ready() {
                return Ok(info);
            }
            if info.provisioning_status.is_gone() {
                return Err(RouterOrchError::NotFound(format!(
                    "router {} went {} while provisioning",
                    uid, info.provisioning_status
                )));
            }
            last = info.provisioning_status;
            if poll < self.provisioning.max_polls {
                tokio::time::sleep(self.provisioning.poll_interval()).await;
            }
        }
        Err(RouterOrchError::ProvisioningTimeout {
            uid: uid.to_string(),
            polls: self.provisioning.max_polls,
            status: last,
        })
    }
}

/// Orders remote lists as they were tracked; lists created out of band
/// follow in id order.
fn in_tracked_order(
    tracked: &[RoutingPolicyList],
    mut remote: Vec<RoutingPolicyList>,
) -> Vec<RoutingPolicyList> {
    remote.sort_by_key(|l| {
        let position = tracked
            .iter()
            .position(|t| t.id.is_some() && t.id == l.id)
            .unwrap_or(usize::MAX);
        (position, l.id)
    });
    remote
}
