//! Declarative virtual router.

use serde::{Deserialize, Serialize};
use vxc_api::api::{RouterCreateRequest, RouterInfo, RouterUpdateRequest};

use crate::circuit::VALID_TERMS;
use crate::error::ValidationError;
use crate::policy::{validate_collection, RoutingPolicyList};

fn default_term() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualRouter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub location_id: u32,
    pub speed_mbps: u32,
    #[serde(default = "default_term")]
    pub term_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(default)]
    pub cost_centre: String,
    #[serde(default)]
    pub prefix_lists: Vec<RoutingPolicyList>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<String>,
}

impl VirtualRouter {
    /// Checks the router attributes and its lists.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid_field("name", "must not be empty"));
        }
        if self.speed_mbps == 0 {
            return Err(ValidationError::invalid_field("speed_mbps", "must be at least 1"));
        }
        if !VALID_TERMS.contains(&self.term_months) {
            return Err(ValidationError::invalid_field(
                "term_months",
                format!("{} is not one of {:?}", self.term_months, VALID_TERMS),
            ));
        }
        validate_collection(&self.prefix_lists)
    }

    pub fn create_request(&self) -> RouterCreateRequest {
        RouterCreateRequest {
            name: self.name.clone(),
            location_id: self.location_id,
            speed_mbps: self.speed_mbps,
            term_months: self.term_months,
            asn: self.asn,
            cost_centre: self.cost_centre.clone(),
        }
    }

    /// Changes that can be applied in place.
    ///
    /// Location, speed and ASN are fixed at order time.
    pub fn update_request(&self, desired: &VirtualRouter) -> Result<RouterUpdateRequest, ValidationError> {
        let fixed = [
            ("location_id", self.location_id != desired.location_id),
            ("speed_mbps", self.speed_mbps != desired.speed_mbps),
            ("asn", self.asn != desired.asn),
        ];
        if let Some((field, _)) = fixed.iter().find(|(_, changed)| *changed) {
            return Err(ValidationError::invalid_field(
                *field,
                "cannot be changed in place; recreate the router",
            ));
        }
        Ok(RouterUpdateRequest {
            name: (self.name != desired.name).then(|| desired.name.clone()),
            cost_centre: (self.cost_centre != desired.cost_centre)
                .then(|| desired.cost_centre.clone()),
            term_months: (self.term_months != desired.term_months).then_some(desired.term_months),
        })
    }

    /// Builds the tracked value from the service state and the lists.
    pub fn from_remote(info: &RouterInfo, prefix_lists: Vec<RoutingPolicyList>) -> Self {
        Self {
            id: Some(info.uid.as_str().to_string()),
            name: info.name.clone(),
            location_id: info.location_id,
            speed_mbps: info.speed_mbps,
            term_months: info.term_months,
            asn: info.asn,
            cost_centre: info.cost_centre.clone(),
            prefix_lists,
            provisioning_status: Some(info.provisioning_status.to_string()),
        }
    }
}
