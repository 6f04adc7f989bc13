//! CircuitOrch implementation.
//!
//! Sequences classification, partner encoding, remote calls and decoding for
//! one circuit. Holds no circuit state of its own; the caller supplies the
//! tracked and desired values and stores what comes back.

use std::sync::Arc;

use vxc_api::api::{
    CircuitCreateRequest, CircuitInfo, CircuitUpdateRequest, EndpointInfo, EndpointRequest,
    EndpointUpdate, ProvisioningStatus,
};
use vxc_api::{ApiError, AttachmentUid, CircuitUid, FabricApi, RouterUid};
use vxc_types::AttachmentCategory;

use super::classify::{classify, validate_endpoint};
use super::endpoint::{reconcile, CircuitPlan, EndpointOperation, EndpointPlan, EndpointState};
use super::types::{Circuit, Endpoint, Side};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::config::ProvisioningConfig;
use crate::error::ValidationError;
use crate::partner::{
    decode, encode, references_policy_lists, CodecError, EncodeContext, PartnerConfig,
    PolicyListIndex,
};
use crate::{audit_log, debug_log, info_log};

/// Error type for circuit operations.
#[derive(Debug, thiserror::Error)]
pub enum CircuitOrchError {
    #[error("invalid circuit: {0}")]
    Validation(#[from] ValidationError),

    #[error("partner configuration: {0}")]
    Codec(#[from] CodecError),

    #[error("remote call failed: {0}")]
    Remote(#[source] ApiError),

    #[error("circuit not found: {0}")]
    NotFound(String),

    #[error("circuit {uid} not ready after {polls} poll(s), last status {status}")]
    ProvisioningTimeout {
        uid: String,
        polls: u32,
        status: ProvisioningStatus,
    },
}

impl From<ApiError> for CircuitOrchError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::NotFound { resource, uid } => {
                CircuitOrchError::NotFound(format!("{} {}", resource, uid))
            }
            other => CircuitOrchError::Remote(other),
        }
    }
}

/// Statistics for CircuitOrch operations.
#[derive(Debug, Clone, Default)]
pub struct CircuitOrchStats {
    pub circuits_created: u64,
    pub circuits_updated: u64,
    pub circuits_deleted: u64,
    pub circuits_gone: u64,
    pub replacements_required: u64,
    pub notices: u64,
}

/// Result of [`CircuitOrch::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Applied in place (possibly with nothing to send).
    Updated {
        circuit: Circuit,
        notices: Vec<String>,
    },
    /// Cannot be applied in place. Nothing was sent; the caller destroys
    /// and recreates.
    ReplacementRequired { plan: CircuitPlan },
}

/// CircuitOrch - reconciles virtual circuits against the provisioning API.
pub struct CircuitOrch {
    api: Arc<dyn FabricApi>,
    config: ProvisioningConfig,
    stats: CircuitOrchStats,
}

impl std::fmt::Debug for CircuitOrch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitOrch")
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

fn correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl CircuitOrch {
    pub fn new(api: Arc<dyn FabricApi>, config: ProvisioningConfig) -> Self {
        Self {
            api,
            config,
            stats: CircuitOrchStats::default(),
        }
    }

    pub fn stats(&self) -> &CircuitOrchStats {
        &self.stats
    }

    /// Classifies the attachment a side is requested on.
    async fn category(&self, endpoint: &Endpoint) -> AttachmentCategory {
        if endpoint.requested_id.is_empty() {
            return AttachmentCategory::Unknown;
        }
        classify(self.api.as_ref(), &endpoint.requested()).await
    }

    /// Computes the reconciliation plan without sending anything.
    pub async fn plan(
        &self,
        previous: &Circuit,
        desired: &Circuit,
    ) -> Result<CircuitPlan, CircuitOrchError> {
        let a_category = self.category(&desired.a_end).await;
        let b_category = self.category(&desired.b_end).await;
        Ok(reconcile(previous, desired, a_category, b_category)?)
    }

    /// Orders a circuit and returns its tracked state once provisioned.
    pub async fn create(&mut self, desired: &Circuit) -> Result<Circuit, CircuitOrchError> {
        let correlation = correlation_id();
        desired.validate_attributes()?;

        for side in [Side::A, Side::B] {
            let endpoint = desired.endpoint(side);
            let category = self.category(endpoint).await;
            validate_endpoint(side, category, endpoint, desired.has_cloud_partner(side))?;
        }

        // A first: a router-to-router B side peers with A's resolved router.
        let a_requested = desired.a_end.requested();
        let b_requested = desired.b_end.requested();
        let a_end = self
            .endpoint_request(desired, Side::A, &a_requested, Some(&b_requested))
            .await?;
        let b_end = self
            .endpoint_request(desired, Side::B, &b_requested, Some(&a_end.product_uid))
            .await?;

        let request = CircuitCreateRequest {
            name: desired.name.clone(),
            rate_limit_mbps: desired.bandwidth_mbps,
            term_months: desired.term_months,
            shutdown: desired.shutdown,
            cost_centre: desired.cost_centre.clone(),
            tags: desired.tags.clone(),
            a_end,
            b_end,
        };

        let result = self.api.create_circuit(&request).await;
        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "CircuitOrch", "create_circuit")
                .with_result(&result)
                .with_object_id(
                    result
                        .as_ref()
                        .map(|uid| uid.to_string())
                        .unwrap_or_else(|_| desired.name.clone())
                )
                .with_object_type("circuit")
                .with_correlation_id(correlation.clone())
                .with_details(serde_json::json!({
                    "name": desired.name,
                    "bandwidth_mbps": desired.bandwidth_mbps,
                    "a_end": request.a_end.product_uid,
                    "b_end": request.b_end.product_uid,
                }))
        );
        let uid = result?;
        self.stats.circuits_created += 1;

        let info = self.await_ready(&uid).await?;
        let mut tracked = desired.clone();
        tracked.id = Some(uid.into_string());
        self.from_remote(&info, Some(&tracked)).await
    }

    /// Reads the authoritative state. `Ok(None)` means the circuit is gone
    /// and the caller should drop it.
    pub async fn read(&mut self, tracked: &Circuit) -> Result<Option<Circuit>, CircuitOrchError> {
        let Some(id) = tracked.id.as_deref() else {
            return Ok(None);
        };
        let uid = CircuitUid::new(id);

        let info = match self.api.get_circuit(&uid).await {
            Ok(info) => info,
            Err(e) if e.is_not_found() => {
                info_log!("CircuitOrch", circuit = %uid, "circuit not found, dropping");
                self.stats.circuits_gone += 1;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if info.provisioning_status.is_gone() {
            info_log!(
                "CircuitOrch",
                circuit = %uid,
                status = %info.provisioning_status,
                "circuit is gone, dropping"
            );
            self.stats.circuits_gone += 1;
            return Ok(None);
        }

        self.from_remote(&info, Some(tracked)).await.map(Some)
    }

    /// Imports an existing circuit with no tracked state.
    pub async fn import(&mut self, id: &str) -> Result<Option<Circuit>, CircuitOrchError> {
        let uid = CircuitUid::new(id);
        match self.api.get_circuit(&uid).await {
            Ok(info) if info.provisioning_status.is_gone() => Ok(None),
            Ok(info) => self.from_remote(&info, None).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Applies `desired` in place, or reports that it needs replacement.
    pub async fn update(
        &mut self,
        previous: &Circuit,
        desired: &Circuit,
    ) -> Result<UpdateOutcome, CircuitOrchError> {
        let correlation = correlation_id();
        let id = previous
            .id
            .clone()
            .ok_or_else(|| CircuitOrchError::NotFound(format!("untracked circuit {}", previous.name)))?;
        let uid = CircuitUid::new(id.as_str());

        let plan = self.plan(previous, desired).await?;
        let notices = plan.notices();
        for notice in &notices {
            info_log!("CircuitOrch", circuit = %uid, notice = %notice, "provider-managed value");
        }
        self.stats.notices += notices.len() as u64;

        if plan.requires_replacement() {
            self.stats.replacements_required += 1;
            audit_log!(
                AuditRecord::new(
                    AuditCategory::ReplacementRequired,
                    "CircuitOrch",
                    "update_circuit"
                )
                .with_error(plan.replacement_reasons().join("; "))
                .with_outcome(AuditOutcome::Denied)
                .with_object_id(id.clone())
                .with_object_type("circuit")
                .with_correlation_id(correlation)
            );
            return Ok(UpdateOutcome::ReplacementRequired { plan });
        }

        let tracked = self.next_tracked(previous, desired, &plan);
        let request = self.update_request(previous, desired, &plan).await?;
        if request.is_empty() {
            debug_log!("CircuitOrch", circuit = %uid, "nothing to update");
            return Ok(UpdateOutcome::Updated {
                circuit: tracked,
                notices,
            });
        }

        let result = self.api.update_circuit(&uid, &request).await;
        audit_log!(
            AuditRecord::new(AuditCategory::ResourceModify, "CircuitOrch", "update_circuit")
                .with_result(&result)
                .with_object_id(id.clone())
                .with_object_type("circuit")
                .with_correlation_id(correlation)
                .with_details(serde_json::json!({
                    "fields": plan.fields,
                    "a_end": plan.a_end.operations,
                    "b_end": plan.b_end.operations,
                }))
        );
        result?;
        self.stats.circuits_updated += 1;

        let info = self.await_ready(&uid).await?;
        let circuit = self.from_remote(&info, Some(&tracked)).await?;
        Ok(UpdateOutcome::Updated { circuit, notices })
    }

    /// Deletes the circuit. A circuit that is already gone counts as deleted.
    pub async fn delete(&mut self, tracked: &Circuit) -> Result<(), CircuitOrchError> {
        let Some(id) = tracked.id.as_deref() else {
            return Ok(());
        };
        let uid = CircuitUid::new(id);

        let result = match self.api.delete_circuit(&uid).await {
            Err(e) if e.is_not_found() => {
                debug_log!("CircuitOrch", circuit = %uid, "already deleted");
                Ok(())
            }
            other => other,
        };
        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "CircuitOrch", "delete_circuit")
                .with_result(&result)
                .with_object_id(id)
                .with_object_type("circuit")
                .with_correlation_id(correlation_id())
        );
        result?;
        self.stats.circuits_deleted += 1;
        Ok(())
    }

    /// Polls until the circuit is usable.
    async fn await_ready(&self, uid: &CircuitUid) -> Result<CircuitInfo, CircuitOrchError> {
        let mut last = ProvisioningStatus::Unknown;
        for poll in 1..=self.config.max_polls {
            let info = self.api.get_circuit(uid).await?;
            if info.provisioning_status.is_ready() {
                debug_log!("CircuitOrch", circuit = %uid, polls = poll, "circuit ready");
                return Ok(info);
            }
            if info.provisioning_status.is_gone() {
                return Err(CircuitOrchError::NotFound(format!(
                    "circuit {} went {} while provisioning",
                    uid, info.provisioning_status
                )));
            }
            last = info.provisioning_status;
            if poll < self.config.max_polls {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }
        Err(CircuitOrchError::ProvisioningTimeout {
            uid: uid.to_string(),
            polls: self.config.max_polls,
            status: last,
        })
    }

    async fn endpoint_request(
        &self,
        circuit: &Circuit,
        side: Side,
        requested: &AttachmentUid,
        opposite: Option<&AttachmentUid>,
    ) -> Result<EndpointRequest, CircuitOrchError> {
        let endpoint = circuit.endpoint(side);
        let (product_uid, partner_config) = match circuit.partner(side) {
            Some(config) => {
                let ctx = EncodeContext {
                    attachment: requested,
                    opposite,
                };
                let encoded = encode(self.api.as_ref(), config, ctx).await?;
                (encoded.attachment, Some(encoded.payload))
            }
            None => (requested.clone(), None),
        };
        Ok(EndpointRequest {
            product_uid,
            vlan: endpoint.vlan,
            inner_vlan: endpoint.inner_vlan,
            vnic_index: endpoint.vnic_index,
            partner_config,
        })
    }

    /// Tracked value to carry forward after an in-place update.
    fn next_tracked(&self, previous: &Circuit, desired: &Circuit, plan: &CircuitPlan) -> Circuit {
        let mut next = desired.clone();
        next.id = previous.id.clone();
        next.provisioning_status = previous.provisioning_status.clone();
        for side in [Side::A, Side::B] {
            let side_plan = plan.endpoint(side);
            let endpoint = next.endpoint_mut(side);
            endpoint.current_id = previous.endpoint(side).current_id.clone();
            if let Some(current) = &side_plan.requested_override {
                endpoint.requested_id = current.clone();
            }
            if side_plan.state == EndpointState::PartnerIsProviderManaged {
                let tracked = previous.endpoint(side);
                endpoint.vlan = tracked.vlan;
                endpoint.inner_vlan = tracked.inner_vlan;
                endpoint.vnic_index = tracked.vnic_index;
            }
            // A provider-managed partner is never re-sent, so the created
            // value stays the tracked one.
            if previous.has_cloud_partner(side) && desired.has_cloud_partner(side) {
                *next.partner_mut(side) = previous.partner(side).cloned();
            }
        }
        next
    }

    /// Attachment a side lands on after the planned operations.
    fn landing(previous: &Circuit, plan: &EndpointPlan) -> AttachmentUid {
        plan.operations
            .iter()
            .find_map(|op| match op {
                EndpointOperation::Repoint { attachment, .. } => {
                    Some(AttachmentUid::new(attachment.as_str()))
                }
                _ => None,
            })
            .unwrap_or_else(|| previous.endpoint(plan.side).resolved())
    }

    async fn endpoint_update(
        &self,
        previous: &Circuit,
        desired: &Circuit,
        plan: &CircuitPlan,
        side: Side,
    ) -> Result<Option<EndpointUpdate>, CircuitOrchError> {
        let side_plan = plan.endpoint(side);
        let mut update = EndpointUpdate::default();
        for op in &side_plan.operations {
            match op {
                EndpointOperation::Repoint {
                    attachment,
                    vlan,
                    inner_vlan,
                    vnic_index,
                } => {
                    update.product_uid = Some(AttachmentUid::new(attachment.as_str()));
                    update.vlan = *vlan;
                    update.inner_vlan = *inner_vlan;
                    update.vnic_index = *vnic_index;
                }
                EndpointOperation::Retag {
                    vlan,
                    inner_vlan,
                    vnic_index,
                } => {
                    update.vlan = *vlan;
                    update.inner_vlan = *inner_vlan;
                    update.vnic_index = *vnic_index;
                }
                EndpointOperation::ResubmitPartner => {
                    if let Some(config) = desired.partner(side) {
                        let attachment = Self::landing(previous, side_plan);
                        let opposite = Self::landing(previous, plan.endpoint(side.opposite()));
                        let ctx = EncodeContext {
                            attachment: &attachment,
                            opposite: Some(&opposite),
                        };
                        let encoded = encode(self.api.as_ref(), config, ctx).await?;
                        update.partner_config = Some(encoded.payload);
                    }
                }
            }
        }
        Ok((!update.is_empty()).then_some(update))
    }

    async fn update_request(
        &self,
        previous: &Circuit,
        desired: &Circuit,
        plan: &CircuitPlan,
    ) -> Result<CircuitUpdateRequest, CircuitOrchError> {
        let fields = plan.fields.clone();
        Ok(CircuitUpdateRequest {
            name: fields.name,
            rate_limit_mbps: fields.bandwidth_mbps,
            term_months: fields.term_months,
            shutdown: fields.shutdown,
            cost_centre: fields.cost_centre,
            tags: fields.tags,
            a_end: self.endpoint_update(previous, desired, plan, Side::A).await?,
            b_end: self.endpoint_update(previous, desired, plan, Side::B).await?,
        })
    }

    /// Decodes the remote partner of one side against its tracked value.
    async fn decode_partner(
        &self,
        remote: &EndpointInfo,
        tracked: Option<&PartnerConfig>,
    ) -> Result<Option<PartnerConfig>, CircuitOrchError> {
        let payload = remote.partner_config.as_ref();
        let owner = RouterUid::from(&remote.product_uid);
        let lists = match payload {
            Some(p) if references_policy_lists(p) => {
                PolicyListIndex::fetch(self.api.as_ref(), &owner).await?
            }
            _ => PolicyListIndex::empty(&owner),
        };
        Ok(decode(payload, tracked, &lists)?)
    }

    /// Merges one remote side into its tracked value.
    ///
    /// With nothing tracked (import) the requested attachment is seeded from
    /// the current one. A provider-managed side keeps an empty request.
    async fn merge_side(
        &self,
        remote: &EndpointInfo,
        tracked: Option<&Endpoint>,
        tracked_partner: Option<&PartnerConfig>,
    ) -> Result<(Endpoint, Option<PartnerConfig>), CircuitOrchError> {
        let current = remote.product_uid.as_str().to_string();
        let requested_id = match tracked {
            Some(e) if !e.requested_id.is_empty() => e.requested_id.clone(),
            Some(e) if tracked_partner.is_some_and(PartnerConfig::is_cloud) => {
                e.requested_id.clone()
            }
            _ => current.clone(),
        };
        let endpoint = Endpoint {
            requested_id,
            current_id: Some(current),
            vlan: remote.vlan,
            inner_vlan: remote.inner_vlan,
            vnic_index: remote.vnic_index,
        };
        let partner = self.decode_partner(remote, tracked_partner).await?;
        Ok((endpoint, partner))
    }

    /// Merges the authoritative state into the tracked value.
    async fn from_remote(
        &self,
        info: &CircuitInfo,
        tracked: Option<&Circuit>,
    ) -> Result<Circuit, CircuitOrchError> {
        let (a_end, a_end_partner) = self
            .merge_side(
                &info.a_end,
                tracked.map(|t| &t.a_end),
                tracked.and_then(|t| t.partner(Side::A)),
            )
            .await?;
        let (b_end, b_end_partner) = self
            .merge_side(
                &info.b_end,
                tracked.map(|t| &t.b_end),
                tracked.and_then(|t| t.partner(Side::B)),
            )
            .await?;

        let mut circuit = Circuit {
            id: Some(info.uid.as_str().to_string()),
            name: info.name.clone(),
            bandwidth_mbps: info.rate_limit_mbps,
            term_months: info.term_months,
            shutdown: info.shutdown,
            cost_centre: info.cost_centre.clone(),
            tags: info.tags.clone(),
            a_end,
            b_end,
            a_end_partner,
            b_end_partner,
            provisioning_status: Some(info.provisioning_status.to_string()),
        };
        implicit_peers(&mut circuit, tracked);
        Ok(circuit)
    }
}

/// Clears a decoded router-to-router peer that only restates the opposite
/// side, when the tracked value left it implicit.
fn implicit_peers(circuit: &mut Circuit, tracked: Option<&Circuit>) {
    for side in [Side::A, Side::B] {
        let implicit = matches!(
            tracked.and_then(|t| t.partner(side)),
            Some(PartnerConfig::RouterToRouter(c)) if c.peer_router_id.is_none()
        );
        if !implicit {
            continue;
        }
        let opposite = circuit.endpoint(side.opposite()).current_id.clone();
        if let Some(PartnerConfig::RouterToRouter(config)) = circuit.partner_mut(side) {
            if config.peer_router_id.is_some() && config.peer_router_id == opposite {
                config.peer_router_id = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::{AwsConfig, GoogleConfig, RouterToRouterConfig};
    use pretty_assertions::assert_eq;
    use vxc_api::api::{AwsConnectionKind, CloudProvider, PartnerPayload, PortSelector};
    use vxc_test::{vlan, MockFabric, MockOp};
    use vxc_types::VlanTag;

    fn fast() -> ProvisioningConfig {
        ProvisioningConfig {
            poll_interval_ms: 1,
            max_polls: 5,
        }
    }

    fn port_circuit(a: &str, b: &str) -> Circuit {
        Circuit {
            id: None,
            name: "web".to_string(),
            bandwidth_mbps: 100,
            term_months: 1,
            shutdown: false,
            cost_centre: String::new(),
            tags: Default::default(),
            a_end: Endpoint::new(a).with_vlan(vlan(100)),
            b_end: Endpoint::new(b).with_vlan(vlan(200)),
            a_end_partner: None,
            b_end_partner: None,
            provisioning_status: None,
        }
    }

    fn setup() -> (Arc<MockFabric>, CircuitOrch) {
        let fabric = Arc::new(MockFabric::new());
        fabric.add_attachment("port-a", "PORT");
        fabric.add_attachment("port-b", "PORT");
        fabric.add_attachment("port-c", "PORT");
        let orch = CircuitOrch::new(fabric.clone(), fast());
        (fabric, orch)
    }

    #[tokio::test]
    async fn test_create_reads_back_tracked_state() {
        let (fabric, mut orch) = setup();
        fabric.set_polls_until_ready(2);

        let created = orch.create(&port_circuit("port-a", "port-b")).await.unwrap();

        assert_eq!(created.id.as_deref(), Some("vxc-0001"));
        assert_eq!(created.a_end.requested_id, "port-a");
        assert_eq!(created.a_end.current_id.as_deref(), Some("port-a"));
        assert_eq!(created.provisioning_status.as_deref(), Some("LIVE"));
        assert_eq!(fabric.count(MockOp::CreateCircuit), 1);
        assert_eq!(fabric.count(MockOp::GetCircuit), 3);
        assert_eq!(orch.stats().circuits_created, 1);
    }

    #[tokio::test]
    async fn test_create_times_out() {
        let (fabric, mut orch) = setup();
        fabric.set_polls_until_ready(50);

        let err = orch
            .create(&port_circuit("port-a", "port-b"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CircuitOrchError::ProvisioningTimeout { polls: 5, .. }
        ));
    }

    #[tokio::test]
    async fn test_read_gone_circuit_is_none() {
        let (fabric, mut orch) = setup();
        let created = orch.create(&port_circuit("port-a", "port-b")).await.unwrap();

        fabric.set_circuit_status("vxc-0001", ProvisioningStatus::Decommissioned);
        assert_eq!(orch.read(&created).await.unwrap(), None);

        let mut missing = created.clone();
        missing.id = Some("vxc-9999".to_string());
        assert_eq!(orch.read(&missing).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_import_seeds_requested_ids() {
        let (fabric, mut orch) = setup();
        fabric.insert_circuit(vxc_test::circuit_info("vxc-0042", "legacy", "port-a", "port-b"));

        let imported = orch.import("vxc-0042").await.unwrap().unwrap();
        assert_eq!(imported.a_end.requested_id, "port-a");
        assert_eq!(imported.b_end.requested_id, "port-b");
        assert_eq!(imported.name, "legacy");
    }

    #[tokio::test]
    async fn test_update_repoint_and_fields_in_one_call() {
        let (fabric, mut orch) = setup();
        let created = orch.create(&port_circuit("port-a", "port-b")).await.unwrap();

        let mut desired = port_circuit("port-a", "port-c");
        desired.bandwidth_mbps = 500;
        let outcome = orch.update(&created, &desired).await.unwrap();

        let UpdateOutcome::Updated { circuit, notices } = outcome else {
            panic!("expected in-place update");
        };
        assert!(notices.is_empty());
        assert_eq!(fabric.count(MockOp::UpdateCircuit), 1);
        assert_eq!(circuit.bandwidth_mbps, 500);
        assert_eq!(circuit.b_end.current_id.as_deref(), Some("port-c"));
        assert_eq!(circuit.b_end.requested_id, "port-c");
    }

    #[tokio::test]
    async fn test_update_without_changes_sends_nothing() {
        let (fabric, mut orch) = setup();
        let created = orch.create(&port_circuit("port-a", "port-b")).await.unwrap();
        fabric.clear_calls();

        let outcome = orch
            .update(&created, &port_circuit("port-a", "port-b"))
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
        assert_eq!(fabric.mutating_call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_on_missing_circuit_is_not_found() {
        let (_fabric, mut orch) = setup();
        let mut tracked = port_circuit("port-a", "port-b");
        tracked.id = Some("vxc-0404".to_string());
        let mut desired = tracked.clone();
        desired.name = "renamed".to_string();

        let err = orch.update(&tracked, &desired).await.unwrap_err();
        assert!(matches!(err, CircuitOrchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (fabric, mut orch) = setup();
        let created = orch.create(&port_circuit("port-a", "port-b")).await.unwrap();

        orch.delete(&created).await.unwrap();
        orch.delete(&created).await.unwrap();
        assert_eq!(fabric.circuit_count(), 0);
        assert_eq!(orch.stats().circuits_deleted, 2);
    }

    #[tokio::test]
    async fn test_cloud_partner_lands_on_provider_port() {
        let (fabric, mut orch) = setup();
        fabric.add_partner_port(CloudProvider::Google, "pk-1", PortSelector::Primary, "port-gcp-9");
        let mut desired = port_circuit("port-a", "");
        desired.b_end.vlan = None;
        desired.b_end_partner = Some(PartnerConfig::Google(GoogleConfig {
            pairing_key: "pk-1".to_string(),
        }));

        let created = orch.create(&desired).await.unwrap();
        assert_eq!(created.b_end.current_id.as_deref(), Some("port-gcp-9"));
        assert_eq!(created.b_end.requested_id, "");
        assert_eq!(created.b_end_partner, desired.b_end_partner);
    }

    #[tokio::test]
    async fn test_cloud_drift_is_fed_forward() {
        let (fabric, mut orch) = setup();
        let mut desired = port_circuit("port-a", "port-b");
        desired.b_end_partner = Some(PartnerConfig::Aws(AwsConfig {
            connection_kind: AwsConnectionKind::HostedVif,
            owner_account: "123456789012".to_string(),
            name: None,
            asn: None,
            amazon_asn: None,
            auth_key: None,
            prefixes: None,
            customer_ip_address: None,
            amazon_ip_address: None,
        }));
        let created = orch.create(&desired).await.unwrap();

        fabric.add_attachment("port-aws-2", "PORT");
        fabric.relocate_endpoint("vxc-0001", false, "port-aws-2");
        let refreshed = orch.read(&created).await.unwrap().unwrap();
        fabric.clear_calls();

        let outcome = orch.update(&refreshed, &desired).await.unwrap();
        let UpdateOutcome::Updated { circuit, notices } = outcome else {
            panic!("expected in-place update");
        };
        assert_eq!(notices.len(), 1);
        assert_eq!(fabric.mutating_call_count(), 0);
        assert_eq!(circuit.b_end.requested_id, "port-aws-2");
    }

    #[tokio::test]
    async fn test_router_to_router_peer_is_implicit() {
        let fabric = Arc::new(MockFabric::new());
        fabric.insert_router(vxc_test::router_info("mcr-1"));
        fabric.insert_router(vxc_test::router_info("mcr-2"));
        let mut orch = CircuitOrch::new(fabric.clone(), fast());

        let mut desired = port_circuit("mcr-1", "mcr-2");
        desired.a_end.vlan = None;
        desired.b_end.vlan = None;
        desired.a_end_partner = Some(PartnerConfig::RouterToRouter(RouterToRouterConfig::default()));

        let created = orch.create(&desired).await.unwrap();
        assert_eq!(created.a_end_partner, desired.a_end_partner);

        let stored = fabric.circuit("vxc-0001").unwrap();
        let Some(PartnerPayload::RouterToRouter(payload)) = stored.a_end.partner_config else {
            panic!("expected router-to-router payload");
        };
        assert_eq!(payload.peer_router_uid.as_str(), "mcr-2");
        assert_eq!(created.a_end.vlan, None::<VlanTag>);
    }
}
