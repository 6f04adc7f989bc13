//! Virtual router request/response shapes.

use crate::api::circuit::ProvisioningStatus;
use crate::types::RouterUid;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterCreateRequest {
    pub name: String,
    pub location_id: u32,
    pub speed_mbps: u32,
    pub term_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(default)]
    pub cost_centre: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_centre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
}

impl RouterUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self == &RouterUpdateRequest::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterInfo {
    pub uid: RouterUid,
    pub name: String,
    pub location_id: u32,
    pub speed_mbps: u32,
    pub term_months: u32,
    #[serde(default)]
    pub asn: Option<u32>,
    #[serde(default)]
    pub cost_centre: String,
    pub provisioning_status: ProvisioningStatus,
}
