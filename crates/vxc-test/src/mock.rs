//! In-memory provisioning service.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vxc_api::api::{
    AttachmentInfo, CircuitCreateRequest, CircuitInfo, CircuitUpdateRequest, CloudProvider,
    EndpointInfo, EndpointRequest, EndpointUpdate, PartnerPort, PartnerPortQuery,
    PolicyListPayload, PolicyListSummary, PortSelector, ProvisioningStatus, RouterCreateRequest,
    RouterInfo, RouterUpdateRequest,
};
use vxc_api::{
    ApiError, ApiResult, AttachmentUid, CircuitUid, FabricApi, PolicyListId, RouterUid,
};
use vxc_types::{VlanId, VlanTag};

/// Operation kinds recorded in the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateCircuit,
    GetCircuit,
    UpdateCircuit,
    DeleteCircuit,
    LookupAttachment,
    LookupPartnerPort,
    ListPolicyLists,
    GetPolicyList,
    CreatePolicyList,
    UpdatePolicyList,
    DeletePolicyList,
    CreateRouter,
    GetRouter,
    UpdateRouter,
    DeleteRouter,
}

impl MockOp {
    /// Returns true for calls that change remote state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            MockOp::CreateCircuit
                | MockOp::UpdateCircuit
                | MockOp::DeleteCircuit
                | MockOp::CreatePolicyList
                | MockOp::UpdatePolicyList
                | MockOp::DeletePolicyList
                | MockOp::CreateRouter
                | MockOp::UpdateRouter
                | MockOp::DeleteRouter
        )
    }
}

/// One journal entry.
///
/// `target` is the circuit or router UID, the attachment UID or partner key
/// for lookups, the list description for policy-list creates and updates,
/// and the list id for policy-list reads and deletes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub op: MockOp,
    pub target: String,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct Fault {
    op: MockOp,
    target: Option<String>,
    error: ApiError,
    /// `None` fails every matching call.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    circuits: HashMap<String, CircuitInfo>,
    routers: HashMap<String, RouterInfo>,
    /// Reads left before a product reports ready.
    pending_polls: HashMap<String, u32>,
    attachments: HashMap<String, String>,
    partner_ports: HashMap<(CloudProvider, String, PortSelector), PartnerPort>,
    policy_lists: HashMap<String, BTreeMap<PolicyListId, PolicyListPayload>>,
    next_id: u64,
    next_vlan: u16,
    calls: Vec<MockCall>,
    faults: Vec<Fault>,
    polls_until_ready: u32,
    latency: Option<Duration>,
}

impl State {
    fn next_uid(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }

    fn next_list_id(&mut self) -> PolicyListId {
        self.next_id += 1;
        self.next_id
    }

    /// Resolves `AutoAssign` the way the service does.
    fn assign_vlan(&mut self, tag: Option<VlanTag>) -> Option<VlanTag> {
        match tag {
            Some(VlanTag::AutoAssign) => {
                self.next_vlan += 1;
                VlanId::new(self.next_vlan).ok().map(VlanTag::Tagged)
            }
            other => other,
        }
    }

    fn take_fault(&mut self, op: MockOp, target: &str) -> Option<ApiError> {
        let index = self.faults.iter().position(|fault| {
            fault.op == op && fault.target.as_deref().map_or(true, |t| t == target)
        })?;
        let fault = &mut self.faults[index];
        let error = fault.error.clone();
        match fault.remaining {
            Some(n) if n > 1 => fault.remaining = Some(n - 1),
            Some(_) => {
                self.faults.remove(index);
            }
            None => {}
        }
        Some(error)
    }

    fn status_after_read(&mut self, uid: &str) -> Option<ProvisioningStatus> {
        let left = self.pending_polls.get_mut(uid)?;
        if *left == 0 {
            self.pending_polls.remove(uid);
            return Some(ProvisioningStatus::Live);
        }
        *left -= 1;
        Some(ProvisioningStatus::Deployable)
    }
}

/// In-memory implementation of [`FabricApi`].
///
/// Every call is journaled before it is answered, including calls that fail
/// through an injected fault.
#[derive(Debug)]
pub struct MockFabric {
    state: Mutex<State>,
}

impl Default for MockFabric {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFabric {
    pub fn new() -> Self {
        let state = State {
            next_vlan: 99,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Journals the call, applies latency and any matching fault.
    async fn enter(&self, op: MockOp, target: &str) -> ApiResult<()> {
        let (latency, fault) = {
            let mut state = self.state();
            state.calls.push(MockCall {
                op,
                target: target.to_string(),
                at: Instant::now(),
            });
            (state.latency, state.take_fault(op, target))
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match fault {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // ---- seeding ----

    /// Registers an attachment and the product type the lookup reports.
    pub fn add_attachment(&self, uid: &str, product_type: &str) {
        self.state()
            .attachments
            .insert(uid.to_string(), product_type.to_string());
    }

    /// Registers a provider-facing port for a partner key.
    pub fn add_partner_port(
        &self,
        provider: CloudProvider,
        key: &str,
        selector: PortSelector,
        product_uid: &str,
    ) {
        let port = PartnerPort {
            product_uid: AttachmentUid::new(product_uid),
            name: format!("{} {:?} port", provider, selector),
        };
        self.state()
            .partner_ports
            .insert((provider, key.to_string(), selector), port);
        self.add_attachment(product_uid, "PORT");
    }

    /// Inserts a circuit as if it had been provisioned out of band.
    pub fn insert_circuit(&self, info: CircuitInfo) {
        self.state()
            .circuits
            .insert(info.uid.as_str().to_string(), info);
    }

    /// Inserts a ready router with no policy lists.
    pub fn insert_router(&self, info: RouterInfo) {
        let uid = info.uid.as_str().to_string();
        let mut state = self.state();
        state.attachments.insert(uid.clone(), "VROUTER".to_string());
        state.policy_lists.entry(uid.clone()).or_default();
        state.routers.insert(uid, info);
    }

    /// Inserts a policy list under an explicit id.
    pub fn insert_policy_list(&self, router: &str, id: PolicyListId, mut list: PolicyListPayload) {
        list.id = Some(id);
        let mut state = self.state();
        state.next_id = state.next_id.max(id);
        state
            .policy_lists
            .entry(router.to_string())
            .or_default()
            .insert(id, list);
    }

    /// Newly created products report `DEPLOYABLE` for `polls` reads.
    pub fn set_polls_until_ready(&self, polls: u32) {
        self.state().polls_until_ready = polls;
    }

    /// Delays every answer, keeping concurrent calls in flight together.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Forces the reported lifecycle state of a circuit.
    pub fn set_circuit_status(&self, uid: &str, status: ProvisioningStatus) {
        let mut state = self.state();
        state.pending_polls.remove(uid);
        if let Some(circuit) = state.circuits.get_mut(uid) {
            circuit.provisioning_status = status;
        }
    }

    /// Moves one side of a circuit to another attachment, as a provider
    /// migration would.
    pub fn relocate_endpoint(&self, uid: &str, a_end: bool, product_uid: &str) {
        let mut state = self.state();
        if let Some(circuit) = state.circuits.get_mut(uid) {
            let endpoint = if a_end {
                &mut circuit.a_end
            } else {
                &mut circuit.b_end
            };
            endpoint.product_uid = AttachmentUid::new(product_uid);
        }
    }

    // ---- fault injection ----

    /// Fails the next call of `op`.
    pub fn fail_next(&self, op: MockOp, error: ApiError) {
        self.push_fault(op, None, error, Some(1));
    }

    /// Fails every call of `op` addressed to `target`.
    pub fn fail_target(&self, op: MockOp, target: &str, error: ApiError) {
        self.push_fault(op, Some(target.to_string()), error, None);
    }

    /// Fails every call of `op`.
    pub fn fail_always(&self, op: MockOp, error: ApiError) {
        self.push_fault(op, None, error, None);
    }

    fn push_fault(&self, op: MockOp, target: Option<String>, error: ApiError, remaining: Option<u32>) {
        self.state().faults.push(Fault {
            op,
            target,
            error,
            remaining,
        });
    }

    // ---- inspection ----

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn calls_of(&self, op: MockOp) -> Vec<MockCall> {
        self.state()
            .calls
            .iter()
            .filter(|call| call.op == op)
            .cloned()
            .collect()
    }

    pub fn count(&self, op: MockOp) -> usize {
        self.state().calls.iter().filter(|call| call.op == op).count()
    }

    /// Number of calls that changed (or tried to change) remote state.
    pub fn mutating_call_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.op.is_mutating())
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn circuit(&self, uid: &str) -> Option<CircuitInfo> {
        self.state().circuits.get(uid).cloned()
    }

    pub fn circuit_count(&self) -> usize {
        self.state().circuits.len()
    }

    pub fn router(&self, uid: &str) -> Option<RouterInfo> {
        self.state().routers.get(uid).cloned()
    }

    /// Current policy lists of a router, ordered by id.
    pub fn policy_lists(&self, router: &str) -> Vec<PolicyListPayload> {
        self.state()
            .policy_lists
            .get(router)
            .map(|lists| lists.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn endpoint_from_request(state: &mut State, request: &EndpointRequest) -> EndpointInfo {
    EndpointInfo {
        product_uid: request.product_uid.clone(),
        vlan: state.assign_vlan(request.vlan),
        inner_vlan: request.inner_vlan,
        vnic_index: request.vnic_index,
        partner_config: request.partner_config.clone(),
    }
}

fn apply_endpoint_update(state: &mut State, endpoint: &mut EndpointInfo, update: &EndpointUpdate) {
    if let Some(product_uid) = &update.product_uid {
        endpoint.product_uid = product_uid.clone();
    }
    if update.vlan.is_some() {
        endpoint.vlan = state.assign_vlan(update.vlan);
    }
    if update.inner_vlan.is_some() {
        endpoint.inner_vlan = update.inner_vlan;
    }
    if update.vnic_index.is_some() {
        endpoint.vnic_index = update.vnic_index;
    }
    if update.partner_config.is_some() {
        endpoint.partner_config = update.partner_config.clone();
    }
}

#[async_trait]
impl FabricApi for MockFabric {
    async fn create_circuit(&self, request: &CircuitCreateRequest) -> ApiResult<CircuitUid> {
        self.enter(MockOp::CreateCircuit, &request.name).await?;

        let mut state = self.state();
        for end in [&request.a_end, &request.b_end] {
            if !state.attachments.contains_key(end.product_uid.as_str()) {
                return Err(ApiError::invalid_parameter(format!(
                    "unknown attachment {}",
                    end.product_uid
                )));
            }
        }

        let uid = state.next_uid("vxc");
        let a_end = endpoint_from_request(&mut state, &request.a_end);
        let b_end = endpoint_from_request(&mut state, &request.b_end);
        let info = CircuitInfo {
            uid: CircuitUid::new(uid.as_str()),
            name: request.name.clone(),
            rate_limit_mbps: request.rate_limit_mbps,
            term_months: request.term_months,
            shutdown: request.shutdown,
            cost_centre: request.cost_centre.clone(),
            tags: request.tags.clone(),
            provisioning_status: ProvisioningStatus::Deployable,
            a_end,
            b_end,
        };
        let polls = state.polls_until_ready;
        state.pending_polls.insert(uid.clone(), polls);
        state.circuits.insert(uid.clone(), info);
        Ok(CircuitUid::new(uid))
    }

    async fn get_circuit(&self, uid: &CircuitUid) -> ApiResult<CircuitInfo> {
        self.enter(MockOp::GetCircuit, uid.as_str()).await?;

        let mut state = self.state();
        let status = state.status_after_read(uid.as_str());
        let circuit = state
            .circuits
            .get_mut(uid.as_str())
            .ok_or_else(|| ApiError::not_found("circuit", uid.as_str()))?;
        if let Some(status) = status {
            circuit.provisioning_status = status;
        }
        Ok(circuit.clone())
    }

    async fn update_circuit(
        &self,
        uid: &CircuitUid,
        request: &CircuitUpdateRequest,
    ) -> ApiResult<()> {
        self.enter(MockOp::UpdateCircuit, uid.as_str()).await?;

        let mut state = self.state();
        let mut circuit = state
            .circuits
            .remove(uid.as_str())
            .ok_or_else(|| ApiError::not_found("circuit", uid.as_str()))?;

        if let Some(name) = &request.name {
            circuit.name = name.clone();
        }
        if let Some(rate) = request.rate_limit_mbps {
            circuit.rate_limit_mbps = rate;
        }
        if let Some(term) = request.term_months {
            circuit.term_months = term;
        }
        if let Some(shutdown) = request.shutdown {
            circuit.shutdown = shutdown;
        }
        if let Some(cost_centre) = &request.cost_centre {
            circuit.cost_centre = cost_centre.clone();
        }
        if let Some(tags) = &request.tags {
            circuit.tags = tags.clone();
        }
        if let Some(update) = &request.a_end {
            apply_endpoint_update(&mut state, &mut circuit.a_end, update);
        }
        if let Some(update) = &request.b_end {
            apply_endpoint_update(&mut state, &mut circuit.b_end, update);
        }

        state.circuits.insert(uid.as_str().to_string(), circuit);
        Ok(())
    }

    async fn delete_circuit(&self, uid: &CircuitUid) -> ApiResult<()> {
        self.enter(MockOp::DeleteCircuit, uid.as_str()).await?;

        let mut state = self.state();
        state.pending_polls.remove(uid.as_str());
        state
            .circuits
            .remove(uid.as_str())
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("circuit", uid.as_str()))
    }

    async fn lookup_attachment(&self, uid: &AttachmentUid) -> ApiResult<AttachmentInfo> {
        self.enter(MockOp::LookupAttachment, uid.as_str()).await?;

        self.state()
            .attachments
            .get(uid.as_str())
            .map(|product_type| AttachmentInfo {
                product_uid: uid.clone(),
                product_type: product_type.clone(),
            })
            .ok_or_else(|| ApiError::not_found("attachment", uid.as_str()))
    }

    async fn lookup_partner_port(&self, query: &PartnerPortQuery) -> ApiResult<PartnerPort> {
        self.enter(MockOp::LookupPartnerPort, &query.key).await?;

        let selector = query.selector.unwrap_or_default();
        self.state()
            .partner_ports
            .get(&(query.provider, query.key.clone(), selector))
            .cloned()
            .ok_or_else(|| ApiError::not_found("partner port", query.key.as_str()))
    }

    async fn list_policy_lists(&self, router: &RouterUid) -> ApiResult<Vec<PolicyListSummary>> {
        self.enter(MockOp::ListPolicyLists, router.as_str()).await?;

        let state = self.state();
        let lists = state
            .policy_lists
            .get(router.as_str())
            .ok_or_else(|| ApiError::not_found("router", router.as_str()))?;
        Ok(lists
            .iter()
            .map(|(id, list)| PolicyListSummary {
                id: *id,
                description: list.description.clone(),
                address_family: list.address_family,
            })
            .collect())
    }

    async fn get_policy_list(
        &self,
        router: &RouterUid,
        id: PolicyListId,
    ) -> ApiResult<PolicyListPayload> {
        self.enter(MockOp::GetPolicyList, &id.to_string()).await?;

        self.state()
            .policy_lists
            .get(router.as_str())
            .and_then(|lists| lists.get(&id))
            .cloned()
            .ok_or_else(|| ApiError::not_found("policy list", id.to_string()))
    }

    async fn create_policy_list(
        &self,
        router: &RouterUid,
        list: &PolicyListPayload,
    ) -> ApiResult<PolicyListPayload> {
        self.enter(MockOp::CreatePolicyList, &list.description).await?;

        let mut state = self.state();
        if !state.policy_lists.contains_key(router.as_str()) {
            return Err(ApiError::not_found("router", router.as_str()));
        }
        let id = state.next_list_id();
        let mut created = list.clone();
        created.id = Some(id);
        state
            .policy_lists
            .entry(router.as_str().to_string())
            .or_default()
            .insert(id, created.clone());
        Ok(created)
    }

    async fn update_policy_list(
        &self,
        router: &RouterUid,
        id: PolicyListId,
        list: &PolicyListPayload,
    ) -> ApiResult<PolicyListPayload> {
        self.enter(MockOp::UpdatePolicyList, &list.description).await?;

        let mut state = self.state();
        let slot = state
            .policy_lists
            .get_mut(router.as_str())
            .and_then(|lists| lists.get_mut(&id))
            .ok_or_else(|| ApiError::not_found("policy list", id.to_string()))?;
        let mut updated = list.clone();
        updated.id = Some(id);
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete_policy_list(&self, router: &RouterUid, id: PolicyListId) -> ApiResult<()> {
        self.enter(MockOp::DeletePolicyList, &id.to_string()).await?;

        self.state()
            .policy_lists
            .get_mut(router.as_str())
            .and_then(|lists| lists.remove(&id))
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("policy list", id.to_string()))
    }

    async fn create_router(&self, request: &RouterCreateRequest) -> ApiResult<RouterUid> {
        self.enter(MockOp::CreateRouter, &request.name).await?;

        let mut state = self.state();
        let uid = state.next_uid("mcr");
        let info = RouterInfo {
            uid: RouterUid::new(uid.as_str()),
            name: request.name.clone(),
            location_id: request.location_id,
            speed_mbps: request.speed_mbps,
            term_months: request.term_months,
            asn: request.asn,
            cost_centre: request.cost_centre.clone(),
            provisioning_status: ProvisioningStatus::Deployable,
        };
        let polls = state.polls_until_ready;
        state.pending_polls.insert(uid.clone(), polls);
        state.attachments.insert(uid.clone(), "VROUTER".to_string());
        state.policy_lists.insert(uid.clone(), BTreeMap::new());
        state.routers.insert(uid.clone(), info);
        Ok(RouterUid::new(uid))
    }

    async fn get_router(&self, uid: &RouterUid) -> ApiResult<RouterInfo> {
        self.enter(MockOp::GetRouter, uid.as_str()).await?;

        let mut state = self.state();
        let status = state.status_after_read(uid.as_str());
        let router = state
            .routers
            .get_mut(uid.as_str())
            .ok_or_else(|| ApiError::not_found("router", uid.as_str()))?;
        if let Some(status) = status {
            router.provisioning_status = status;
        }
        Ok(router.clone())
    }

    async fn update_router(&self, uid: &RouterUid, request: &RouterUpdateRequest) -> ApiResult<()> {
        self.enter(MockOp::UpdateRouter, uid.as_str()).await?;

        let mut state = self.state();
        let router = state
            .routers
            .get_mut(uid.as_str())
            .ok_or_else(|| ApiError::not_found("router", uid.as_str()))?;
        if let Some(name) = &request.name {
            router.name = name.clone();
        }
        if let Some(cost_centre) = &request.cost_centre {
            router.cost_centre = cost_centre.clone();
        }
        if let Some(term) = request.term_months {
            router.term_months = term;
        }
        Ok(())
    }

    async fn delete_router(&self, uid: &RouterUid) -> ApiResult<()> {
        self.enter(MockOp::DeleteRouter, uid.as_str()).await?;

        let mut state = self.state();
        state.pending_polls.remove(uid.as_str());
        state.policy_lists.remove(uid.as_str());
        state.attachments.remove(uid.as_str());
        state
            .routers
            .remove(uid.as_str())
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found("router", uid.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{circuit_request, policy_list_payload, router_info};
    use pretty_assertions::assert_eq;
    use vxc_api::api::PolicyAction;
    use vxc_types::AddressFamily;

    #[tokio::test]
    async fn test_created_circuit_becomes_ready_after_polls() {
        let fabric = MockFabric::new();
        fabric.add_attachment("port-a", "PORT");
        fabric.add_attachment("port-b", "PORT");
        fabric.set_polls_until_ready(1);

        let uid = fabric
            .create_circuit(&circuit_request("web", "port-a", "port-b"))
            .await
            .unwrap();

        let first = fabric.get_circuit(&uid).await.unwrap();
        assert_eq!(first.provisioning_status, ProvisioningStatus::Deployable);
        let second = fabric.get_circuit(&uid).await.unwrap();
        assert_eq!(second.provisioning_status, ProvisioningStatus::Live);
    }

    #[tokio::test]
    async fn test_auto_assign_vlan_resolved() {
        let fabric = MockFabric::new();
        fabric.add_attachment("port-a", "PORT");
        fabric.add_attachment("port-b", "PORT");

        let mut request = circuit_request("web", "port-a", "port-b");
        request.a_end.vlan = Some(VlanTag::AutoAssign);
        let uid = fabric.create_circuit(&request).await.unwrap();

        let info = fabric.circuit(uid.as_str()).unwrap();
        assert!(matches!(info.a_end.vlan, Some(VlanTag::Tagged(_))));
    }

    #[tokio::test]
    async fn test_fault_injection_and_journal() {
        let fabric = MockFabric::new();
        fabric.insert_router(router_info("mcr-1"));
        fabric.fail_next(MockOp::CreatePolicyList, ApiError::unavailable("maintenance"));

        let list = policy_list_payload(
            "customers",
            AddressFamily::Ipv4,
            &[(PolicyAction::Permit, "10.0.0.0/8")],
        );
        let router = RouterUid::new("mcr-1");
        assert!(fabric.create_policy_list(&router, &list).await.is_err());
        let created = fabric.create_policy_list(&router, &list).await.unwrap();

        assert!(created.id.is_some());
        assert_eq!(fabric.count(MockOp::CreatePolicyList), 2);
        assert_eq!(fabric.mutating_call_count(), 2);
        assert_eq!(fabric.policy_lists("mcr-1").len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_attachment_lookup_is_not_found() {
        let fabric = MockFabric::new();
        let err = fabric
            .lookup_attachment(&AttachmentUid::new("nope"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
