//! Declarative circuit state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use vxc_api::AttachmentUid;
use vxc_types::VlanTag;

use crate::error::ValidationError;
use crate::partner::PartnerConfig;

/// Side of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

impl Side {
    pub const fn opposite(&self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => f.write_str("A-End"),
            Side::B => f.write_str("B-End"),
        }
    }
}

/// One side of a circuit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Endpoint {
    /// Attachment the user asked for. Only an explicit edit changes it.
    #[serde(default)]
    pub requested_id: String,
    /// Attachment the service reports. Overwritten on every read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<VlanTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner_vlan: Option<VlanTag>,
    /// Interface index on a virtual appliance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vnic_index: Option<u32>,
}

impl Endpoint {
    pub fn new(requested_id: impl Into<String>) -> Self {
        Self {
            requested_id: requested_id.into(),
            ..Self::default()
        }
    }

    pub fn with_vlan(mut self, vlan: VlanTag) -> Self {
        self.vlan = Some(vlan);
        self
    }

    pub fn requested(&self) -> AttachmentUid {
        AttachmentUid::new(self.requested_id.as_str())
    }

    /// Where the side is landed now, falling back to what was requested.
    pub fn resolved(&self) -> AttachmentUid {
        AttachmentUid::new(self.current_id.as_deref().unwrap_or(&self.requested_id))
    }
}

fn default_term() -> u32 {
    1
}

/// Declarative circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Circuit {
    /// Assigned by the service on create.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub bandwidth_mbps: u32,
    #[serde(default = "default_term")]
    pub term_months: u32,
    #[serde(default)]
    pub shutdown: bool,
    #[serde(default)]
    pub cost_centre: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub a_end: Endpoint,
    pub b_end: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a_end_partner: Option<PartnerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub b_end_partner: Option<PartnerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_status: Option<String>,
}

/// Contract terms the service sells.
pub const VALID_TERMS: [u32; 4] = [1, 12, 24, 36];

impl Circuit {
    pub fn endpoint(&self, side: Side) -> &Endpoint {
        match side {
            Side::A => &self.a_end,
            Side::B => &self.b_end,
        }
    }

    pub fn endpoint_mut(&mut self, side: Side) -> &mut Endpoint {
        match side {
            Side::A => &mut self.a_end,
            Side::B => &mut self.b_end,
        }
    }

    pub fn partner(&self, side: Side) -> Option<&PartnerConfig> {
        match side {
            Side::A => self.a_end_partner.as_ref(),
            Side::B => self.b_end_partner.as_ref(),
        }
    }

    pub fn partner_mut(&mut self, side: Side) -> &mut Option<PartnerConfig> {
        match side {
            Side::A => &mut self.a_end_partner,
            Side::B => &mut self.b_end_partner,
        }
    }

    /// Returns true if the side's partner is provider-managed.
    pub fn has_cloud_partner(&self, side: Side) -> bool {
        self.partner(side).is_some_and(PartnerConfig::is_cloud)
    }

    /// Checks the circuit-wide attributes.
    pub fn validate_attributes(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::invalid_field("name", "must not be empty"));
        }
        if self.bandwidth_mbps == 0 {
            return Err(ValidationError::invalid_field(
                "bandwidth_mbps",
                "must be at least 1",
            ));
        }
        if !VALID_TERMS.contains(&self.term_months) {
            return Err(ValidationError::invalid_field(
                "term_months",
                format!("{} is not one of {:?}", self.term_months, VALID_TERMS),
            ));
        }
        Ok(())
    }
}
