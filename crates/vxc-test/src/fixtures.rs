//! Test fixtures for common remote shapes.
//!
//! Provides ready-made wire objects so tests only spell out the fields
//! they care about.

use std::collections::BTreeMap;

use vxc_api::api::{
    CircuitCreateRequest, CircuitInfo, EndpointInfo, EndpointRequest, PolicyAction,
    PolicyEntryPayload, PolicyListPayload, ProvisioningStatus, RouterInfo,
};
use vxc_api::{AttachmentUid, CircuitUid, RouterUid};
use vxc_types::{AddressFamily, VlanId, VlanTag};

/// Explicit VLAN tag, panicking on an out-of-range id.
pub fn vlan(id: u16) -> VlanTag {
    match VlanId::new(id) {
        Ok(id) => VlanTag::Tagged(id),
        Err(e) => panic!("fixture VLAN {}: {}", id, e),
    }
}

/// Port-to-port create request, both sides tagged with VLAN 100.
pub fn circuit_request(name: &str, a_end: &str, b_end: &str) -> CircuitCreateRequest {
    let end = |uid: &str| EndpointRequest {
        product_uid: AttachmentUid::new(uid),
        vlan: Some(vlan(100)),
        inner_vlan: None,
        vnic_index: None,
        partner_config: None,
    };
    CircuitCreateRequest {
        name: name.to_string(),
        rate_limit_mbps: 100,
        term_months: 1,
        shutdown: false,
        cost_centre: String::new(),
        tags: BTreeMap::new(),
        a_end: end(a_end),
        b_end: end(b_end),
    }
}

/// Endpoint as the service reports it.
pub fn endpoint_info(product_uid: &str, tag: Option<VlanTag>) -> EndpointInfo {
    EndpointInfo {
        product_uid: AttachmentUid::new(product_uid),
        vlan: tag,
        inner_vlan: None,
        vnic_index: None,
        partner_config: None,
    }
}

/// Live port-to-port circuit, both sides on VLAN 100.
pub fn circuit_info(uid: &str, name: &str, a_end: &str, b_end: &str) -> CircuitInfo {
    CircuitInfo {
        uid: CircuitUid::new(uid),
        name: name.to_string(),
        rate_limit_mbps: 100,
        term_months: 1,
        shutdown: false,
        cost_centre: String::new(),
        tags: BTreeMap::new(),
        provisioning_status: ProvisioningStatus::Live,
        a_end: endpoint_info(a_end, Some(vlan(100))),
        b_end: endpoint_info(b_end, Some(vlan(100))),
    }
}

/// Live virtual router.
pub fn router_info(uid: &str) -> RouterInfo {
    RouterInfo {
        uid: RouterUid::new(uid),
        name: format!("router {}", uid),
        location_id: 1,
        speed_mbps: 1000,
        term_months: 1,
        asn: Some(64512),
        cost_centre: String::new(),
        provisioning_status: ProvisioningStatus::Live,
    }
}

/// Policy list with one exact-match entry per `(action, prefix)`.
pub fn policy_list_payload(
    description: &str,
    family: AddressFamily,
    entries: &[(PolicyAction, &str)],
) -> PolicyListPayload {
    PolicyListPayload {
        id: None,
        description: description.to_string(),
        address_family: family,
        entries: entries
            .iter()
            .map(|(action, prefix)| PolicyEntryPayload {
                action: *action,
                prefix: prefix.to_string(),
                ge: None,
                le: None,
            })
            .collect(),
    }
}
