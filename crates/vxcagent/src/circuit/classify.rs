//! Attachment classification and per-category field rules.

use vxc_api::{AttachmentUid, FabricApi};
use vxc_types::AttachmentCategory;

use super::types::{Endpoint, Side};
use crate::error::ValidationError;
use crate::{debug_log, warn_log};

/// Resolves the category of an attachment with one remote lookup.
///
/// A failed lookup yields `Unknown` instead of an error, leaving the final
/// say to the remote service.
pub async fn classify(api: &dyn FabricApi, uid: &AttachmentUid) -> AttachmentCategory {
    match api.lookup_attachment(uid).await {
        Ok(info) => {
            let category = AttachmentCategory::from_product_type(&info.product_type);
            debug_log!(
                "Classifier",
                attachment = %uid,
                product_type = %info.product_type,
                category = %category,
                "classified attachment"
            );
            category
        }
        Err(e) => {
            warn_log!(
                "Classifier",
                attachment = %uid,
                error = %e,
                "attachment lookup failed, treating as unknown"
            );
            AttachmentCategory::Unknown
        }
    }
}

/// Whether a field may, must, or must not be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    Required,
    Optional,
    Forbidden,
}

/// Allowed fields of an endpoint on one attachment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRules {
    pub vlan: FieldRule,
    pub inner_vlan: FieldRule,
    pub vnic_index: FieldRule,
}

const FIELD_RULES: [(AttachmentCategory, FieldRules); 4] = [
    (
        AttachmentCategory::Port,
        FieldRules {
            vlan: FieldRule::Required,
            inner_vlan: FieldRule::Optional,
            vnic_index: FieldRule::Forbidden,
        },
    ),
    (
        AttachmentCategory::VirtualRouter,
        FieldRules {
            vlan: FieldRule::Forbidden,
            inner_vlan: FieldRule::Forbidden,
            vnic_index: FieldRule::Forbidden,
        },
    ),
    (
        AttachmentCategory::VirtualAppliance,
        FieldRules {
            vlan: FieldRule::Forbidden,
            inner_vlan: FieldRule::Optional,
            vnic_index: FieldRule::Optional,
        },
    ),
    (
        AttachmentCategory::Unknown,
        FieldRules {
            vlan: FieldRule::Optional,
            inner_vlan: FieldRule::Optional,
            vnic_index: FieldRule::Optional,
        },
    ),
];

impl FieldRules {
    pub fn for_category(category: AttachmentCategory) -> FieldRules {
        FIELD_RULES
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, rules)| *rules)
            .unwrap_or(FieldRules {
                vlan: FieldRule::Optional,
                inner_vlan: FieldRule::Optional,
                vnic_index: FieldRule::Optional,
            })
    }
}

/// Checks an endpoint against the field rules of its category.
///
/// A cloud partner relaxes the port VLAN requirement: the provider side
/// may assign it.
pub fn validate_endpoint(
    side: Side,
    category: AttachmentCategory,
    endpoint: &Endpoint,
    cloud_partner: bool,
) -> Result<(), ValidationError> {
    if endpoint.requested_id.is_empty() && !cloud_partner {
        return Err(ValidationError::MissingAttachment { side });
    }

    let rules = FieldRules::for_category(category);
    match (rules.vlan, endpoint.vlan.is_some()) {
        (FieldRule::Forbidden, true) => {
            return Err(ValidationError::VlanNotAllowed { side, category })
        }
        (FieldRule::Required, false) if !cloud_partner => {
            return Err(ValidationError::VlanRequired { side })
        }
        _ => {}
    }
    if rules.inner_vlan == FieldRule::Forbidden && endpoint.inner_vlan.is_some() {
        return Err(ValidationError::InnerVlanNotAllowed { side, category });
    }
    if rules.vnic_index == FieldRule::Forbidden && endpoint.vnic_index.is_some() {
        return Err(ValidationError::VnicIndexNotAllowed { side, category });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use vxc_api::ApiError;
    use vxc_test::{MockFabric, MockOp};
    use vxc_types::VlanTag;

    #[tokio::test]
    async fn test_classify_by_product_type() {
        let fabric = MockFabric::new();
        fabric.add_attachment("port-a", "PORT");
        fabric.add_attachment("mcr-1", "VROUTER");
        fabric.add_attachment("mve-1", "APPLIANCE");

        let cases = [
            ("port-a", AttachmentCategory::Port),
            ("mcr-1", AttachmentCategory::VirtualRouter),
            ("mve-1", AttachmentCategory::VirtualAppliance),
        ];
        for (uid, expected) in cases {
            assert_eq!(classify(&fabric, &AttachmentUid::new(uid)).await, expected);
        }
    }

    #[tokio::test]
    async fn test_lookup_failure_is_unknown() {
        let fabric = MockFabric::new();
        fabric.add_attachment("port-a", "PORT");
        fabric.fail_next(MockOp::LookupAttachment, ApiError::unavailable("timeout"));

        let category = classify(&fabric, &AttachmentUid::new("port-a")).await;
        assert_eq!(category, AttachmentCategory::Unknown);
    }

    #[test]
    fn test_rules_table() {
        let router = FieldRules::for_category(AttachmentCategory::VirtualRouter);
        assert_eq!(router.vlan, FieldRule::Forbidden);
        assert_eq!(router.vnic_index, FieldRule::Forbidden);

        let appliance = FieldRules::for_category(AttachmentCategory::VirtualAppliance);
        assert_eq!(appliance.vlan, FieldRule::Forbidden);
        assert_eq!(appliance.vnic_index, FieldRule::Optional);

        let port = FieldRules::for_category(AttachmentCategory::Port);
        assert_eq!(port.vlan, FieldRule::Required);
    }

    #[test]
    fn test_vlan_rejected_on_virtual_categories() {
        let endpoint = Endpoint::new("mcr-1").with_vlan(VlanTag::AutoAssign);
        for category in [
            AttachmentCategory::VirtualRouter,
            AttachmentCategory::VirtualAppliance,
        ] {
            let err = validate_endpoint(Side::A, category, &endpoint, false).unwrap_err();
            assert_eq!(err, ValidationError::VlanNotAllowed { side: Side::A, category });
        }
    }

    #[test]
    fn test_port_requires_vlan_unless_cloud() {
        let endpoint = Endpoint::new("port-a");
        assert_eq!(
            validate_endpoint(Side::B, AttachmentCategory::Port, &endpoint, false).unwrap_err(),
            ValidationError::VlanRequired { side: Side::B }
        );
        assert!(validate_endpoint(Side::B, AttachmentCategory::Port, &endpoint, true).is_ok());

        let tagged = endpoint.with_vlan(VlanTag::AutoAssign);
        assert!(validate_endpoint(Side::B, AttachmentCategory::Port, &tagged, false).is_ok());
    }

    #[test]
    fn test_vnic_index_only_on_appliance() {
        let mut endpoint = Endpoint::new("mve-1");
        endpoint.vnic_index = Some(1);
        assert!(
            validate_endpoint(Side::A, AttachmentCategory::VirtualAppliance, &endpoint, false)
                .is_ok()
        );
        assert!(matches!(
            validate_endpoint(Side::A, AttachmentCategory::VirtualRouter, &endpoint, false),
            Err(ValidationError::VnicIndexNotAllowed { .. })
        ));
    }

    #[test]
    fn test_unknown_allows_everything() {
        let mut endpoint = Endpoint::new("x").with_vlan(VlanTag::Untagged);
        endpoint.inner_vlan = Some(VlanTag::Untagged);
        endpoint.vnic_index = Some(0);
        assert!(
            validate_endpoint(Side::A, AttachmentCategory::Unknown, &endpoint, false).is_ok()
        );
    }
}
