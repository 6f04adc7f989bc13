//! Endpoint reconciler.
//!
//! Compares the tracked and desired state of each circuit side and decides,
//! per cycle, between an in-place change, a full replacement, or nothing.
//! Rules are applied in this order:
//!
//! 1. Field rules of the attachment category (a VLAN on a virtual router or
//!    appliance is rejected here, before anything is sent).
//! 2. A kind change that involves a cloud partner, adding a cloud partner,
//!    or removing any partner cannot be applied in place and escalates to
//!    replacement. The update request has no way to clear a partner payload.
//! 3. A cloud partner is provider-managed: nothing is queued for the side.
//!    The service's attachment wins over the requested one, which is
//!    reported and fed forward instead of being re-pointed.
//! 4. Otherwise a changed requested attachment re-points the side; failing
//!    that, changed tagging retags it.
//! 5. A changed non-cloud partner configuration is re-encoded and resubmitted.

use serde::Serialize;
use std::collections::BTreeMap;
use vxc_types::{AttachmentCategory, VlanTag};

use super::classify::validate_endpoint;
use super::types::{Circuit, Endpoint, Side};
use crate::error::ValidationError;
use crate::partner::PartnerConfig;

/// What happened to one side between two cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointState {
    Unchanged,
    AttachmentChanged,
    TaggingChanged,
    PartnerChanged,
    PartnerIsProviderManaged,
}

/// In-place change queued for one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EndpointOperation {
    /// Move the side to another attachment, with its full tagging.
    Repoint {
        attachment: String,
        vlan: Option<VlanTag>,
        inner_vlan: Option<VlanTag>,
        vnic_index: Option<u32>,
    },
    /// Change tagging only. `None` fields are left as they are.
    Retag {
        vlan: Option<VlanTag>,
        inner_vlan: Option<VlanTag>,
        vnic_index: Option<u32>,
    },
    /// Encode the desired partner configuration and send it again.
    ResubmitPartner,
}

/// Reconciliation result of one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndpointPlan {
    pub side: Side,
    pub category: AttachmentCategory,
    pub state: EndpointState,
    pub operations: Vec<EndpointOperation>,
    pub requires_replacement: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement_reason: Option<String>,
    /// Informational messages for the user.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    /// Requested attachment to record instead of the desired one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_override: Option<String>,
}

impl EndpointPlan {
    fn new(side: Side, category: AttachmentCategory) -> Self {
        Self {
            side,
            category,
            state: EndpointState::Unchanged,
            operations: Vec::new(),
            requires_replacement: false,
            replacement_reason: None,
            notices: Vec::new(),
            requested_override: None,
        }
    }

    fn replace(mut self, reason: String) -> Self {
        self.state = EndpointState::PartnerChanged;
        self.requires_replacement = true;
        self.replacement_reason = Some(reason);
        self
    }

    fn mark(&mut self, state: EndpointState) {
        if self.state == EndpointState::Unchanged {
            self.state = state;
        }
    }

    pub fn has_operations(&self) -> bool {
        !self.operations.is_empty()
    }
}

/// Inputs for one side.
#[derive(Debug, Clone, Copy)]
pub struct EndpointInput<'a> {
    pub side: Side,
    pub category: AttachmentCategory,
    pub previous: &'a Endpoint,
    pub desired: &'a Endpoint,
    pub previous_partner: Option<&'a PartnerConfig>,
    pub desired_partner: Option<&'a PartnerConfig>,
}

/// Desired tag differs from the tracked one. `AutoAssign` matches any VLAN
/// the service has picked; an absent desired tag expresses no opinion.
fn tag_differs(desired: Option<VlanTag>, previous: Option<VlanTag>) -> bool {
    match desired {
        None => false,
        Some(VlanTag::AutoAssign) => matches!(previous, None | Some(VlanTag::Untagged)),
        Some(tag) => previous != Some(tag),
    }
}

fn retag(previous: &Endpoint, desired: &Endpoint) -> Option<EndpointOperation> {
    let vlan = desired.vlan.filter(|_| tag_differs(desired.vlan, previous.vlan));
    let inner_vlan = desired
        .inner_vlan
        .filter(|_| tag_differs(desired.inner_vlan, previous.inner_vlan));
    let vnic_index = desired
        .vnic_index
        .filter(|index| previous.vnic_index != Some(*index));

    if vlan.is_none() && inner_vlan.is_none() && vnic_index.is_none() {
        return None;
    }
    Some(EndpointOperation::Retag {
        vlan,
        inner_vlan,
        vnic_index,
    })
}

/// Escalation reason, if the partner transition cannot happen in place.
fn partner_replacement(
    previous: Option<&PartnerConfig>,
    desired: Option<&PartnerConfig>,
) -> Option<String> {
    match (previous, desired) {
        (Some(p), Some(d)) if p.kind() != d.kind() && (p.is_cloud() || d.is_cloud()) => Some(
            format!("partner kind changed from {} to {}", p.kind(), d.kind()),
        ),
        (None, Some(d)) if d.is_cloud() => Some(format!("{} partner added", d.kind())),
        (Some(p), None) => Some(format!("{} partner removed", p.kind())),
        _ => None,
    }
}

/// Reconciles one side.
pub fn reconcile_endpoint(input: EndpointInput<'_>) -> Result<EndpointPlan, ValidationError> {
    let EndpointInput {
        side,
        category,
        previous,
        desired,
        previous_partner,
        desired_partner,
    } = input;

    let cloud = desired_partner.is_some_and(PartnerConfig::is_cloud);
    validate_endpoint(side, category, desired, cloud)?;

    let mut plan = EndpointPlan::new(side, category);

    if let Some(reason) = partner_replacement(previous_partner, desired_partner) {
        return Ok(plan.replace(format!("{}: {}", side, reason)));
    }

    if cloud {
        plan.state = EndpointState::PartnerIsProviderManaged;
        if let Some(current) = previous.current_id.as_deref() {
            if !desired.requested_id.is_empty() && current != desired.requested_id {
                plan.notices.push(format!(
                    "{}: attachment {} is assigned by the cloud provider; requested {} is kept for reference only",
                    side, current, desired.requested_id
                ));
                plan.requested_override = Some(current.to_string());
            }
        }
        if previous_partner != desired_partner {
            plan.notices.push(format!(
                "{}: {} partner settings are managed by the provider and are not changed in place",
                side,
                desired_partner.map(PartnerConfig::kind).map_or_else(String::new, |k| k.to_string())
            ));
        }
        return Ok(plan);
    }

    if desired.requested_id != previous.requested_id {
        plan.mark(EndpointState::AttachmentChanged);
        plan.operations.push(EndpointOperation::Repoint {
            attachment: desired.requested_id.clone(),
            vlan: desired.vlan,
            inner_vlan: desired.inner_vlan,
            vnic_index: desired.vnic_index,
        });
    } else if let Some(op) = retag(previous, desired) {
        plan.mark(EndpointState::TaggingChanged);
        plan.operations.push(op);
    }

    if desired_partner.is_some() && previous_partner != desired_partner {
        plan.mark(EndpointState::PartnerChanged);
        plan.operations.push(EndpointOperation::ResubmitPartner);
    }

    Ok(plan)
}

/// Circuit-wide attribute changes. `None` means unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_mbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub term_months: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_centre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl FieldChanges {
    pub fn between(previous: &Circuit, desired: &Circuit) -> Self {
        fn changed<T: PartialEq + Clone>(previous: &T, desired: &T) -> Option<T> {
            (previous != desired).then(|| desired.clone())
        }
        Self {
            name: changed(&previous.name, &desired.name),
            bandwidth_mbps: changed(&previous.bandwidth_mbps, &desired.bandwidth_mbps),
            term_months: changed(&previous.term_months, &desired.term_months),
            shutdown: changed(&previous.shutdown, &desired.shutdown),
            cost_centre: changed(&previous.cost_centre, &desired.cost_centre),
            tags: changed(&previous.tags, &desired.tags),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &FieldChanges::default()
    }
}

/// Reconciliation result of a whole circuit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitPlan {
    pub fields: FieldChanges,
    pub a_end: EndpointPlan,
    pub b_end: EndpointPlan,
}

impl CircuitPlan {
    pub fn endpoint(&self, side: Side) -> &EndpointPlan {
        match side {
            Side::A => &self.a_end,
            Side::B => &self.b_end,
        }
    }

    pub fn requires_replacement(&self) -> bool {
        self.a_end.requires_replacement || self.b_end.requires_replacement
    }

    /// Returns true if nothing needs to be sent.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && !self.a_end.has_operations() && !self.b_end.has_operations()
    }

    pub fn notices(&self) -> Vec<String> {
        self.a_end
            .notices
            .iter()
            .chain(self.b_end.notices.iter())
            .cloned()
            .collect()
    }

    pub fn replacement_reasons(&self) -> Vec<String> {
        [&self.a_end, &self.b_end]
            .into_iter()
            .filter_map(|plan| plan.replacement_reason.clone())
            .collect()
    }
}

/// Reconciles both sides of a circuit against the given categories.
pub fn reconcile(
    previous: &Circuit,
    desired: &Circuit,
    a_category: AttachmentCategory,
    b_category: AttachmentCategory,
) -> Result<CircuitPlan, ValidationError> {
    desired.validate_attributes()?;

    let side_input = |side: Side, category: AttachmentCategory| EndpointInput {
        side,
        category,
        previous: previous.endpoint(side),
        desired: desired.endpoint(side),
        previous_partner: previous.partner(side),
        desired_partner: desired.partner(side),
    };

    Ok(CircuitPlan {
        fields: FieldChanges::between(previous, desired),
        a_end: reconcile_endpoint(side_input(Side::A, a_category))?,
        b_end: reconcile_endpoint(side_input(Side::B, b_category))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partner::{
        AwsConfig, AzureConfig, GoogleConfig, IbmConfig, OracleConfig, RouterInterfaceConfig,
        VrouterConfig,
    };
    use pretty_assertions::assert_eq;
    use vxc_api::api::{AwsConnectionKind, PortSelector};
    use vxc_types::VlanId;

    fn vlan(id: u16) -> VlanTag {
        VlanTag::Tagged(VlanId::new(id).unwrap())
    }

    fn aws() -> PartnerConfig {
        PartnerConfig::Aws(AwsConfig {
            connection_kind: AwsConnectionKind::HostedVif,
            owner_account: "123456789012".to_string(),
            name: None,
            asn: Some(64512),
            amazon_asn: None,
            auth_key: None,
            prefixes: None,
            customer_ip_address: None,
            amazon_ip_address: None,
        })
    }

    fn azure() -> PartnerConfig {
        PartnerConfig::Azure(AzureConfig {
            service_key: "sk-1".to_string(),
            port_choice: PortSelector::Primary,
            peers: vec![],
        })
    }

    fn google() -> PartnerConfig {
        PartnerConfig::Google(GoogleConfig {
            pairing_key: "pk-1".to_string(),
        })
    }

    fn oracle() -> PartnerConfig {
        PartnerConfig::Oracle(OracleConfig {
            virtual_circuit_id: "ocid1.virtualcircuit.oc1.iad.aaaa".to_string(),
        })
    }

    fn ibm() -> PartnerConfig {
        PartnerConfig::Ibm(IbmConfig {
            account_id: "a1b2c3d4e5f60718293a4b5c6d7e8f90".to_string(),
            name: None,
            customer_asn: Some(64513),
            customer_ip_address: None,
            provider_ip_address: None,
        })
    }

    fn vrouter(address: &str) -> PartnerConfig {
        PartnerConfig::Vrouter(VrouterConfig {
            interfaces: vec![RouterInterfaceConfig {
                ip_addresses: vec![address.to_string()],
                ..RouterInterfaceConfig::default()
            }],
        })
    }

    fn tracked(requested: &str, current: &str, tag: Option<VlanTag>) -> Endpoint {
        Endpoint {
            requested_id: requested.to_string(),
            current_id: Some(current.to_string()),
            vlan: tag,
            ..Endpoint::default()
        }
    }

    fn input<'a>(
        category: AttachmentCategory,
        previous: &'a Endpoint,
        desired: &'a Endpoint,
        previous_partner: Option<&'a PartnerConfig>,
        desired_partner: Option<&'a PartnerConfig>,
    ) -> EndpointInput<'a> {
        EndpointInput {
            side: Side::B,
            category,
            previous,
            desired,
            previous_partner,
            desired_partner,
        }
    }

    #[test]
    fn test_unchanged() {
        let previous = tracked("port-a", "port-a", Some(vlan(100)));
        let desired = Endpoint::new("port-a").with_vlan(vlan(100));
        let plan =
            reconcile_endpoint(input(AttachmentCategory::Port, &previous, &desired, None, None))
                .unwrap();
        assert_eq!(plan.state, EndpointState::Unchanged);
        assert!(plan.operations.is_empty());
        assert!(!plan.requires_replacement);
    }

    #[test]
    fn test_vlan_on_virtual_router_rejected() {
        let previous = tracked("mcr-1", "mcr-1", None);
        let desired = Endpoint::new("mcr-1").with_vlan(vlan(10));
        let err = reconcile_endpoint(input(
            AttachmentCategory::VirtualRouter,
            &previous,
            &desired,
            None,
            None,
        ))
        .unwrap_err();
        assert!(matches!(err, ValidationError::VlanNotAllowed { .. }));
    }

    #[test]
    fn test_cloud_drift_yields_notice_only() {
        let previous = tracked("port-aws-1", "port-aws-7", Some(vlan(300)));
        let desired = Endpoint::new("port-aws-1").with_vlan(vlan(300));
        let partner = aws();

        let plan = reconcile_endpoint(input(
            AttachmentCategory::Port,
            &previous,
            &desired,
            Some(&partner),
            Some(&partner),
        ))
        .unwrap();

        assert_eq!(plan.state, EndpointState::PartnerIsProviderManaged);
        assert!(plan.operations.is_empty());
        assert!(!plan.requires_replacement);
        assert_eq!(plan.notices.len(), 1);
        assert_eq!(plan.requested_override.as_deref(), Some("port-aws-7"));
    }

    #[test]
    fn test_cloud_side_is_never_retagged() {
        let previous = tracked("port-aws-1", "port-aws-7", Some(vlan(301)));
        let mut desired = Endpoint::new("port-aws-1").with_vlan(vlan(300));
        desired.inner_vlan = Some(vlan(12));
        let partner = aws();

        let plan = reconcile_endpoint(input(
            AttachmentCategory::Port,
            &previous,
            &desired,
            Some(&partner),
            Some(&partner),
        ))
        .unwrap();

        assert_eq!(plan.state, EndpointState::PartnerIsProviderManaged);
        assert!(plan.operations.is_empty());
        assert!(!plan.requires_replacement);
        assert_eq!(plan.notices.len(), 1);
        assert_eq!(plan.requested_override.as_deref(), Some("port-aws-7"));

        let in_place = tracked("port-aws-1", "port-aws-1", Some(vlan(301)));
        let plan = reconcile_endpoint(input(
            AttachmentCategory::Port,
            &in_place,
            &desired,
            Some(&partner),
            Some(&partner),
        ))
        .unwrap();
        assert!(plan.operations.is_empty());
        assert!(plan.notices.is_empty());
        assert_eq!(plan.requested_override, None);
    }

    #[test]
    fn test_every_cloud_kind_keeps_provider_attachment() {
        let cases = [
            ("aws", aws()),
            ("azure", azure()),
            ("google", google()),
            ("oracle", oracle()),
            ("ibm", ibm()),
        ];

        for (kind, partner) in cases {
            assert_eq!(partner.kind().to_string(), kind);
            assert!(partner.is_cloud(), "{}", kind);

            let previous = tracked("port-requested", "port-provider", Some(vlan(400)));
            let desired = Endpoint::new("port-requested").with_vlan(vlan(401));

            let plan = reconcile_endpoint(input(
                AttachmentCategory::Port,
                &previous,
                &desired,
                Some(&partner),
                Some(&partner),
            ))
            .unwrap();

            assert_eq!(plan.state, EndpointState::PartnerIsProviderManaged, "{}", kind);
            assert!(plan.operations.is_empty(), "{}: {:?}", kind, plan.operations);
            assert!(!plan.requires_replacement, "{}", kind);
            assert_eq!(plan.notices.len(), 1, "{}", kind);
            assert!(plan.notices[0].contains("port-provider"), "{}", kind);
            assert_eq!(
                plan.requested_override.as_deref(),
                Some("port-provider"),
                "{}",
                kind
            );
        }
    }

    #[test]
    fn test_cloud_kind_change_requires_replacement() {
        let previous = tracked("port-aws-1", "port-aws-1", None);
        let desired = Endpoint::new("port-aws-1");
        let (from, to) = (aws(), azure());

        let plan = reconcile_endpoint(input(
            AttachmentCategory::Port,
            &previous,
            &desired,
            Some(&from),
            Some(&to),
        ))
        .unwrap();

        assert!(plan.requires_replacement);
        assert!(plan.operations.is_empty());
        assert_eq!(
            plan.replacement_reason.as_deref(),
            Some("B-End: partner kind changed from aws to azure")
        );
    }

    #[test]
    fn test_cloud_content_change_not_applied() {
        let previous = tracked("port-g", "port-g", None);
        let desired = Endpoint::new("port-g");
        let from = PartnerConfig::Google(GoogleConfig {
            pairing_key: "pk-1".to_string(),
        });
        let to = PartnerConfig::Google(GoogleConfig {
            pairing_key: "pk-2".to_string(),
        });

        let plan = reconcile_endpoint(input(
            AttachmentCategory::Port,
            &previous,
            &desired,
            Some(&from),
            Some(&to),
        ))
        .unwrap();
        assert!(plan.operations.is_empty());
        assert!(!plan.requires_replacement);
        assert_eq!(plan.notices.len(), 1);
    }

    #[test]
    fn test_attachment_change_repoints_with_tagging() {
        let previous = tracked("port-a", "port-a", Some(vlan(100)));
        let desired = Endpoint::new("port-c").with_vlan(vlan(200));
        let plan =
            reconcile_endpoint(input(AttachmentCategory::Port, &previous, &desired, None, None))
                .unwrap();

        assert_eq!(plan.state, EndpointState::AttachmentChanged);
        assert_eq!(
            plan.operations,
            vec![EndpointOperation::Repoint {
                attachment: "port-c".to_string(),
                vlan: Some(vlan(200)),
                inner_vlan: None,
                vnic_index: None,
            }]
        );
    }

    #[test]
    fn test_tagging_change_retags_changed_fields_only() {
        let mut previous = tracked("port-a", "port-a", Some(vlan(100)));
        previous.inner_vlan = Some(vlan(5));
        let mut desired = Endpoint::new("port-a").with_vlan(vlan(100));
        desired.inner_vlan = Some(vlan(6));

        let plan =
            reconcile_endpoint(input(AttachmentCategory::Port, &previous, &desired, None, None))
                .unwrap();
        assert_eq!(plan.state, EndpointState::TaggingChanged);
        assert_eq!(
            plan.operations,
            vec![EndpointOperation::Retag {
                vlan: None,
                inner_vlan: Some(vlan(6)),
                vnic_index: None,
            }]
        );
    }

    #[test]
    fn test_auto_assign_matches_assigned_vlan() {
        let previous = tracked("port-a", "port-a", Some(vlan(1234)));
        let desired = Endpoint::new("port-a").with_vlan(VlanTag::AutoAssign);
        let plan =
            reconcile_endpoint(input(AttachmentCategory::Port, &previous, &desired, None, None))
                .unwrap();
        assert_eq!(plan.state, EndpointState::Unchanged);

        let untagged = tracked("port-a", "port-a", Some(VlanTag::Untagged));
        let plan =
            reconcile_endpoint(input(AttachmentCategory::Port, &untagged, &desired, None, None))
                .unwrap();
        assert_eq!(plan.state, EndpointState::TaggingChanged);
    }

    #[test]
    fn test_non_cloud_partner_change_resubmits() {
        let previous = tracked("mcr-1", "mcr-1", None);
        let desired = Endpoint::new("mcr-1");
        let (from, to) = (vrouter("10.0.0.1/30"), vrouter("10.0.0.5/30"));

        let plan = reconcile_endpoint(input(
            AttachmentCategory::VirtualRouter,
            &previous,
            &desired,
            Some(&from),
            Some(&to),
        ))
        .unwrap();
        assert_eq!(plan.state, EndpointState::PartnerChanged);
        assert_eq!(plan.operations, vec![EndpointOperation::ResubmitPartner]);

        let transit = PartnerConfig::Transit;
        let plan = reconcile_endpoint(input(
            AttachmentCategory::VirtualRouter,
            &previous,
            &desired,
            Some(&from),
            Some(&transit),
        ))
        .unwrap();
        assert!(!plan.requires_replacement);
        assert_eq!(plan.operations, vec![EndpointOperation::ResubmitPartner]);
    }

    #[test]
    fn test_partner_removal_requires_replacement() {
        let previous = tracked("mcr-1", "mcr-1", None);
        let desired = Endpoint::new("mcr-1");
        let from = vrouter("10.0.0.1/30");
        let plan = reconcile_endpoint(input(
            AttachmentCategory::VirtualRouter,
            &previous,
            &desired,
            Some(&from),
            None,
        ))
        .unwrap();
        assert!(plan.requires_replacement);
        assert!(plan.operations.is_empty());
        assert_eq!(
            plan.replacement_reason.as_deref(),
            Some("B-End: vrouter partner removed")
        );

        let transit = PartnerConfig::Transit;
        let plan = reconcile_endpoint(input(
            AttachmentCategory::VirtualRouter,
            &previous,
            &desired,
            Some(&transit),
            None,
        ))
        .unwrap();
        assert_eq!(
            plan.replacement_reason.as_deref(),
            Some("B-End: transit partner removed")
        );
    }
}
