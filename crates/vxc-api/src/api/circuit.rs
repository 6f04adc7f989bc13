//! Circuit request/response shapes.

use crate::api::partner::PartnerPayload;
use crate::types::{AttachmentUid, CircuitUid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vxc_types::VlanTag;

/// Lifecycle state reported by the service for a provisioned product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningStatus {
    New,
    Design,
    Deployable,
    Configured,
    Live,
    Decommissioned,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ProvisioningStatus {
    /// Returns true once the product is usable.
    pub fn is_ready(&self) -> bool {
        matches!(self, ProvisioningStatus::Configured | ProvisioningStatus::Live)
    }

    /// Returns true if the product no longer exists from the caller's view.
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            ProvisioningStatus::Decommissioned | ProvisioningStatus::Cancelled
        )
    }
}

impl fmt::Display for ProvisioningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProvisioningStatus::New => "NEW",
            ProvisioningStatus::Design => "DESIGN",
            ProvisioningStatus::Deployable => "DEPLOYABLE",
            ProvisioningStatus::Configured => "CONFIGURED",
            ProvisioningStatus::Live => "LIVE",
            ProvisioningStatus::Decommissioned => "DECOMMISSIONED",
            ProvisioningStatus::Cancelled => "CANCELLED",
            ProvisioningStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One side of a circuit in a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointRequest {
    pub product_uid: AttachmentUid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_config: Option<PartnerPayload>,
}

/// Create request for a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitCreateRequest {
    pub name: String,
    pub rate_limit_mbps: u32,
    pub term_months: u32,
    pub shutdown: bool,
    #[serde(default)]
    pub cost_centre: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub a_end: EndpointRequest,
    pub b_end: EndpointRequest,
}

/// Per-side changes in an update request. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uid: Option<AttachmentUid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_config: Option<PartnerPayload>,
}

impl EndpointUpdate {
    pub fn is_empty(&self) -> bool {
        self == &EndpointUpdate::default()
    }
}

/// Update request for a circuit. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit_mbps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_centre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_end: Option<EndpointUpdate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_end: Option<EndpointUpdate>,
}

impl CircuitUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self == &CircuitUpdateRequest::default()
    }
}

/// One side of a circuit as reported by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointInfo {
    /// Attachment the side is currently landed on.
    pub product_uid: AttachmentUid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_config: Option<PartnerPayload>,
}

/// Authoritative circuit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitInfo {
    pub uid: CircuitUid,
    pub name: String,
    pub rate_limit_mbps: u32,
    pub term_months: u32,
    pub shutdown: bool,
    #[serde(default)]
    pub cost_centre: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub provisioning_status: ProvisioningStatus,
    pub a_end: EndpointInfo,
    pub b_end: EndpointInfo,
}

/// Result of an attachment-category lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub product_uid: AttachmentUid,
    pub product_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_status_classification() {
        assert!(ProvisioningStatus::Live.is_ready());
        assert!(ProvisioningStatus::Configured.is_ready());
        assert!(!ProvisioningStatus::Deployable.is_ready());
        assert!(ProvisioningStatus::Decommissioned.is_gone());
        assert!(!ProvisioningStatus::Live.is_gone());
    }

    #[test]
    fn test_unknown_status_tolerated() {
        let status: ProvisioningStatus = serde_json::from_str("\"LOCKED\"").unwrap();
        assert_eq!(status, ProvisioningStatus::Unknown);
    }

    #[test]
    fn test_update_request_skips_absent_fields() {
        let req = CircuitUpdateRequest {
            shutdown: Some(true),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&req).unwrap(), r#"{"shutdown":true}"#);
        assert!(!req.is_empty());
        assert!(CircuitUpdateRequest::default().is_empty());
    }
}
