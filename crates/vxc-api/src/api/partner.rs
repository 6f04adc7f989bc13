//! Partner configuration payloads.
//!
//! A circuit side that connects to a cloud provider, to the transit
//! service, or to a virtual router's routing plane carries one of these
//! payloads. The service tags the payload with `connectType`.

use crate::types::{AttachmentUid, PolicyListId, RouterUid};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "connectType")]
pub enum PartnerPayload {
    #[serde(rename = "AWS")]
    Aws(AwsPayload),
    #[serde(rename = "AZURE")]
    Azure(AzurePayload),
    #[serde(rename = "GOOGLE")]
    Google(GooglePayload),
    #[serde(rename = "ORACLE")]
    Oracle(OraclePayload),
    #[serde(rename = "IBM")]
    Ibm(IbmPayload),
    #[serde(rename = "TRANSIT")]
    Transit,
    #[serde(rename = "VROUTER")]
    Vrouter(VrouterPayload),
    #[serde(rename = "ROUTER_TO_ROUTER")]
    RouterToRouter(RouterToRouterPayload),
}

impl PartnerPayload {
    /// The `connectType` tag of this payload.
    pub fn connect_type(&self) -> &'static str {
        match self {
            PartnerPayload::Aws(_) => "AWS",
            PartnerPayload::Azure(_) => "AZURE",
            PartnerPayload::Google(_) => "GOOGLE",
            PartnerPayload::Oracle(_) => "ORACLE",
            PartnerPayload::Ibm(_) => "IBM",
            PartnerPayload::Transit => "TRANSIT",
            PartnerPayload::Vrouter(_) => "VROUTER",
            PartnerPayload::RouterToRouter(_) => "ROUTER_TO_ROUTER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AwsConnectionKind {
    /// Hosted virtual interface.
    HostedVif,
    /// Hosted connection.
    HostedConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsPayload {
    pub kind: AwsConnectionKind,
    pub owner_account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon_asn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amazon_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzurePeering {
    pub peer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_asn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_subnet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefixes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzurePayload {
    pub service_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<AzurePeering>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePayload {
    pub pairing_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OraclePayload {
    pub virtual_circuit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IbmPayload {
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_asn: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BfdPayload {
    pub tx_interval: u32,
    pub rx_interval: u32,
    pub multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpRoutePayload {
    pub prefix: String,
    pub next_hop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A BGP session; routing-policy lists are referenced by numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BgpConnectionPayload {
    pub peer_asn: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_asn: Option<u32>,
    pub local_ip_address: String,
    pub peer_ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub shutdown: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_in: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub med_out: Option<u32>,
    #[serde(default)]
    pub bfd_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_permit_list_id: Option<PolicyListId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_deny_list_id: Option<PolicyListId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_permit_list_id: Option<PolicyListId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_deny_list_id: Option<PolicyListId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permit_export_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_export_to: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterInterfacePayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_routes: Vec<IpRoutePayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nat_ip_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bfd: Option<BfdPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bgp_connections: Vec<BgpConnectionPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VrouterPayload {
    pub interfaces: Vec<RouterInterfacePayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterToRouterPayload {
    pub peer_router_uid: RouterUid,
    pub interfaces: Vec<RouterInterfacePayload>,
}

/// Cloud provider owning a partner port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CloudProvider {
    Aws,
    Azure,
    Google,
    Oracle,
    Ibm,
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloudProvider::Aws => "AWS",
            CloudProvider::Azure => "AZURE",
            CloudProvider::Google => "GOOGLE",
            CloudProvider::Oracle => "ORACLE",
            CloudProvider::Ibm => "IBM",
        };
        f.write_str(s)
    }
}

/// Which of a redundant pair of provider ports to land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortSelector {
    #[default]
    Primary,
    Secondary,
}

/// Lookup of the provider-facing port for a partner key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPortQuery {
    pub provider: CloudProvider,
    /// Service key, pairing key, account or circuit id, depending on provider.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<PortSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerPort {
    pub product_uid: AttachmentUid,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_payload_tagged_by_connect_type() {
        let payload = PartnerPayload::Google(GooglePayload {
            pairing_key: "pk-1/us-east4/1".to_string(),
        });
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["connectType"], "GOOGLE");
        assert_eq!(json["pairingKey"], "pk-1/us-east4/1");

        let transit = serde_json::to_value(&PartnerPayload::Transit).unwrap();
        assert_eq!(transit, serde_json::json!({"connectType": "TRANSIT"}));
    }

    #[test]
    fn test_bgp_list_ids_on_wire() {
        let raw = r#"{
            "connectType": "VROUTER",
            "interfaces": [{
                "ipAddresses": ["10.0.0.1/30"],
                "bgpConnections": [{
                    "peerAsn": 65001,
                    "localIpAddress": "10.0.0.1",
                    "peerIpAddress": "10.0.0.2",
                    "importPermitListId": 7
                }]
            }]
        }"#;
        let payload: PartnerPayload = serde_json::from_str(raw).unwrap();
        let PartnerPayload::Vrouter(vrouter) = payload else {
            panic!("expected vrouter payload");
        };
        let bgp = &vrouter.interfaces[0].bgp_connections[0];
        assert_eq!(bgp.import_permit_list_id, Some(7));
        assert!(!bgp.shutdown);
    }
}
