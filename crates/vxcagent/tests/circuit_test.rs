//! Circuit reconciliation against the in-memory provisioning service.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use vxc_api::api::{AwsConnectionKind, CloudProvider, PortSelector};
use vxc_test::{vlan, MockFabric, MockOp};
use vxc_types::AttachmentCategory;
use vxcagent::circuit::{
    reconcile, Circuit, CircuitOrch, CircuitOrchError, Endpoint, EndpointState, Side,
    UpdateOutcome,
};
use vxcagent::config::ProvisioningConfig;
use vxcagent::partner::{
    AwsConfig, AzureConfig, GoogleConfig, IbmConfig, OracleConfig, PartnerConfig,
};
use vxcagent::ValidationError;

fn fast() -> ProvisioningConfig {
    ProvisioningConfig {
        poll_interval_ms: 1,
        max_polls: 5,
    }
}

fn circuit(a_end: Endpoint, b_end: Endpoint) -> Circuit {
    Circuit {
        id: None,
        name: "backbone".to_string(),
        bandwidth_mbps: 1000,
        term_months: 12,
        shutdown: false,
        cost_centre: "net-ops".to_string(),
        tags: Default::default(),
        a_end,
        b_end,
        a_end_partner: None,
        b_end_partner: None,
        provisioning_status: None,
    }
}

fn aws() -> PartnerConfig {
    PartnerConfig::Aws(AwsConfig {
        connection_kind: AwsConnectionKind::HostedVif,
        owner_account: "123456789012".to_string(),
        name: Some("prod".to_string()),
        asn: Some(65000),
        amazon_asn: None,
        auth_key: None,
        prefixes: None,
        customer_ip_address: None,
        amazon_ip_address: None,
    })
}

fn cloud_partners() -> Vec<PartnerConfig> {
    vec![
        aws(),
        PartnerConfig::Azure(AzureConfig {
            service_key: "azure-key-1".to_string(),
            port_choice: PortSelector::Primary,
            peers: Vec::new(),
        }),
        PartnerConfig::Google(GoogleConfig {
            pairing_key: "pk-1".to_string(),
        }),
        PartnerConfig::Oracle(OracleConfig {
            virtual_circuit_id: "ocid1.virtualcircuit.oc1.phx.bbbb".to_string(),
        }),
        PartnerConfig::Ibm(IbmConfig {
            account_id: "0123456789abcdef0123456789abcdef".to_string(),
            name: Some("prod".to_string()),
            customer_asn: Some(65001),
            customer_ip_address: None,
            provider_ip_address: None,
        }),
    ]
}

fn fabric() -> Arc<MockFabric> {
    let fabric = Arc::new(MockFabric::new());
    fabric.add_attachment("port-a", "PORT");
    fabric.add_attachment("port-b", "PORT");
    fabric.add_attachment("nfv-1", "APPLIANCE");
    fabric.insert_router(vxc_test::router_info("mcr-1"));
    fabric
}

#[tokio::test]
async fn test_vlan_on_virtual_router_is_rejected_before_any_call() {
    let fabric = fabric();
    let mut orch = CircuitOrch::new(fabric.clone(), fast());

    let desired = circuit(
        Endpoint::new("mcr-1").with_vlan(vlan(100)),
        Endpoint::new("port-b").with_vlan(vlan(200)),
    );
    let err = orch.create(&desired).await.unwrap_err();

    assert!(matches!(
        err,
        CircuitOrchError::Validation(ValidationError::VlanNotAllowed {
            side: Side::A,
            category: AttachmentCategory::VirtualRouter,
        })
    ));
    assert_eq!(fabric.mutating_call_count(), 0);
    assert_eq!(fabric.circuit_count(), 0);
}

#[tokio::test]
async fn test_repoint_to_appliance_with_vlan_is_rejected() {
    let fabric = fabric();
    let mut orch = CircuitOrch::new(fabric.clone(), fast());
    let created = orch
        .create(&circuit(
            Endpoint::new("port-a").with_vlan(vlan(100)),
            Endpoint::new("port-b").with_vlan(vlan(200)),
        ))
        .await
        .unwrap();
    fabric.clear_calls();

    let desired = circuit(
        Endpoint::new("port-a").with_vlan(vlan(100)),
        Endpoint::new("nfv-1").with_vlan(vlan(200)),
    );
    let err = orch.update(&created, &desired).await.unwrap_err();

    assert!(matches!(
        err,
        CircuitOrchError::Validation(ValidationError::VlanNotAllowed { side: Side::B, .. })
    ));
    assert_eq!(fabric.mutating_call_count(), 0);
}

#[test]
fn test_cloud_attachment_mismatch_plans_nothing() {
    let mut previous = circuit(
        Endpoint::new("port-a").with_vlan(vlan(100)),
        Endpoint::new("port-aws-1").with_vlan(vlan(200)),
    );
    previous.id = Some("vxc-0001".to_string());
    previous.a_end.current_id = Some("port-a".to_string());
    previous.b_end.current_id = Some("port-aws-2".to_string());
    previous.b_end_partner = Some(aws());

    let mut desired = previous.clone();
    desired.a_end.current_id = None;
    desired.b_end.current_id = None;

    let plan = reconcile(
        &previous,
        &desired,
        AttachmentCategory::Port,
        AttachmentCategory::Port,
    )
    .unwrap();

    let b_end = plan.endpoint(Side::B);
    assert_eq!(b_end.state, EndpointState::PartnerIsProviderManaged);
    assert!(b_end.operations.is_empty());
    assert!(!b_end.requires_replacement);
    assert_eq!(b_end.notices.len(), 1);
    assert_eq!(b_end.requested_override.as_deref(), Some("port-aws-2"));
    assert!(plan.is_empty());
}

#[test]
fn test_cloud_attachment_mismatch_with_new_vlan_plans_nothing_for_every_provider() {
    for partner in cloud_partners() {
        let kind = partner.kind();
        let mut previous = circuit(
            Endpoint::new("port-a").with_vlan(vlan(100)),
            Endpoint::new("port-cloud-1").with_vlan(vlan(301)),
        );
        previous.id = Some("vxc-0001".to_string());
        previous.a_end.current_id = Some("port-a".to_string());
        previous.b_end.current_id = Some("port-cloud-7".to_string());
        previous.b_end_partner = Some(partner);

        let mut desired = previous.clone();
        desired.a_end.current_id = None;
        desired.b_end.current_id = None;
        desired.b_end.vlan = Some(vlan(300));

        let plan = reconcile(
            &previous,
            &desired,
            AttachmentCategory::Port,
            AttachmentCategory::Port,
        )
        .unwrap();

        let b_end = plan.endpoint(Side::B);
        assert_eq!(b_end.state, EndpointState::PartnerIsProviderManaged, "{}", kind);
        assert!(b_end.operations.is_empty(), "{}: {:?}", kind, b_end.operations);
        assert!(!b_end.requires_replacement, "{}", kind);
        assert_eq!(b_end.notices.len(), 1, "{}", kind);
        assert_eq!(b_end.requested_override.as_deref(), Some("port-cloud-7"), "{}", kind);
        assert!(plan.is_empty(), "{}", kind);
    }
}

#[tokio::test]
async fn test_relocated_google_port_is_fed_forward_without_calls() {
    let fabric = fabric();
    fabric.add_partner_port(CloudProvider::Google, "pk-1", PortSelector::Primary, "port-gcp-1");
    let mut orch = CircuitOrch::new(fabric.clone(), fast());

    let mut desired = circuit(
        Endpoint::new("port-a").with_vlan(vlan(100)),
        Endpoint::new("port-gcp-1").with_vlan(vlan(200)),
    );
    desired.b_end_partner = Some(PartnerConfig::Google(GoogleConfig {
        pairing_key: "pk-1".to_string(),
    }));
    let created = orch.create(&desired).await.unwrap();
    assert_eq!(created.b_end.current_id.as_deref(), Some("port-gcp-1"));

    fabric.add_attachment("port-gcp-2", "PORT");
    fabric.relocate_endpoint("vxc-0001", false, "port-gcp-2");
    let refreshed = orch.read(&created).await.unwrap().unwrap();
    assert_eq!(refreshed.b_end.current_id.as_deref(), Some("port-gcp-2"));
    fabric.clear_calls();

    desired.b_end.vlan = Some(vlan(201));
    let UpdateOutcome::Updated { circuit: updated, notices } =
        orch.update(&refreshed, &desired).await.unwrap()
    else {
        panic!("expected in-place update");
    };

    assert_eq!(notices.len(), 1);
    assert!(notices[0].contains("port-gcp-2"));
    assert_eq!(fabric.mutating_call_count(), 0);
    assert_eq!(fabric.count(MockOp::UpdateCircuit), 0);
    assert_eq!(updated.b_end.requested_id, "port-gcp-2");
    assert_eq!(updated.b_end.vlan, Some(vlan(200)));
    assert_eq!(fabric.circuit("vxc-0001").unwrap().b_end.vlan, Some(vlan(200)));
}

#[tokio::test]
async fn test_cloud_partner_kind_change_requires_replacement() {
    let fabric = fabric();
    let mut orch = CircuitOrch::new(fabric.clone(), fast());
    let mut desired = circuit(
        Endpoint::new("port-a").with_vlan(vlan(100)),
        Endpoint::new("port-b").with_vlan(vlan(200)),
    );
    desired.b_end_partner = Some(aws());
    let created = orch.create(&desired).await.unwrap();
    fabric.clear_calls();

    desired.b_end_partner = Some(PartnerConfig::Azure(AzureConfig {
        service_key: "azure-key-1".to_string(),
        port_choice: Default::default(),
        peers: Vec::new(),
    }));
    let outcome = orch.update(&created, &desired).await.unwrap();

    let UpdateOutcome::ReplacementRequired { plan } = outcome else {
        panic!("expected replacement");
    };
    assert_eq!(
        plan.replacement_reasons(),
        vec!["B-End: partner kind changed from aws to azure".to_string()]
    );
    assert_eq!(fabric.count(MockOp::UpdateCircuit), 0);
    assert_eq!(fabric.mutating_call_count(), 0);
    assert_eq!(orch.stats().replacements_required, 1);
}

#[tokio::test]
async fn test_retag_and_rename_in_one_update() {
    let fabric = fabric();
    let mut orch = CircuitOrch::new(fabric.clone(), fast());
    let created = orch
        .create(&circuit(
            Endpoint::new("port-a").with_vlan(vlan(100)),
            Endpoint::new("port-b").with_vlan(vlan(200)),
        ))
        .await
        .unwrap();

    let mut desired = circuit(
        Endpoint::new("port-a").with_vlan(vlan(101)),
        Endpoint::new("port-b").with_vlan(vlan(200)),
    );
    desired.name = "backbone-2".to_string();
    let UpdateOutcome::Updated { circuit: updated, .. } =
        orch.update(&created, &desired).await.unwrap()
    else {
        panic!("expected in-place update");
    };

    assert_eq!(fabric.count(MockOp::UpdateCircuit), 1);
    assert_eq!(updated.name, "backbone-2");
    assert_eq!(updated.a_end.vlan, Some(vlan(101)));
    assert_eq!(updated.b_end.vlan, Some(vlan(200)));

    let stored = fabric.circuit("vxc-0001").unwrap();
    assert_eq!(stored.a_end.vlan, Some(vlan(101)));
}
