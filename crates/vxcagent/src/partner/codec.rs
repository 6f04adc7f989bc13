//! Partner configuration codec.
//!
//! Encoding may need the remote service: cloud kinds resolve the
//! provider-facing port for their partner key, and router kinds resolve
//! routing-policy list names to the numeric ids the wire carries. The pure
//! halves ([`encode_payload`], [`decode_payload`]) take those answers as
//! arguments.
//!
//! Cloud payloads are never decoded. Once the provider has negotiated its
//! side the service reports state that cannot be mapped back onto what the
//! user wrote, so [`decode`] keeps the tracked value instead.

use std::collections::HashMap;

use thiserror::Error;
use vxc_api::api::{
    AwsPayload, AzurePayload, AzurePeering, BfdPayload, BgpConnectionPayload, CloudProvider,
    GooglePayload, IbmPayload, IpRoutePayload, OraclePayload, PartnerPayload, PartnerPortQuery,
    PolicyListSummary, RouterInterfacePayload, RouterToRouterPayload, VrouterPayload,
};
use vxc_api::{ApiError, AttachmentUid, FabricApi, PolicyListId, RouterUid};

use super::types::{
    AwsConfig, AzureConfig, AzurePeeringConfig, BfdConfig, BgpConnectionConfig, IbmConfig,
    IpRouteConfig, PartnerConfig, PartnerKind, RouterInterfaceConfig, RouterToRouterConfig,
    VrouterConfig,
};
use crate::debug_log;

/// Error type for partner encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("routing-policy list '{name}' not found on router {router}")]
    UnknownPolicyList { router: String, name: String },

    #[error("routing-policy list id {id} not found on router {router}")]
    UnknownPolicyListId { router: String, id: PolicyListId },

    #[error("router-to-router partner needs a peer router: set peer_router_id or attach the opposite side to a router")]
    MissingPeerRouter,

    #[error("no {provider} port for partner key {key}: {source}")]
    PartnerPortLookup {
        provider: CloudProvider,
        key: String,
        #[source]
        source: ApiError,
    },

    #[error("failed to list routing-policy lists of router {router}: {source}")]
    PolicyListFetch {
        router: String,
        #[source]
        source: ApiError,
    },
}

/// Name/id mapping of one router's routing-policy lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyListIndex {
    router: String,
    by_name: HashMap<String, PolicyListId>,
    by_id: HashMap<PolicyListId, String>,
}

impl PolicyListIndex {
    pub fn new(router: &RouterUid, summaries: &[PolicyListSummary]) -> Self {
        Self {
            router: router.as_str().to_string(),
            by_name: summaries
                .iter()
                .map(|s| (s.description.clone(), s.id))
                .collect(),
            by_id: summaries
                .iter()
                .map(|s| (s.id, s.description.clone()))
                .collect(),
        }
    }

    /// Index with no lists, for payloads that reference none.
    pub fn empty(router: &RouterUid) -> Self {
        Self::new(router, &[])
    }

    /// Lists the router's policy lists remotely.
    pub async fn fetch(api: &dyn FabricApi, router: &RouterUid) -> Result<Self, CodecError> {
        let summaries =
            api.list_policy_lists(router)
                .await
                .map_err(|source| CodecError::PolicyListFetch {
                    router: router.to_string(),
                    source,
                })?;
        Ok(Self::new(router, &summaries))
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn id_of(&self, name: &str) -> Result<PolicyListId, CodecError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CodecError::UnknownPolicyList {
                router: self.router.clone(),
                name: name.to_string(),
            })
    }

    pub fn name_of(&self, id: PolicyListId) -> Result<String, CodecError> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| CodecError::UnknownPolicyListId {
                router: self.router.clone(),
                id,
            })
    }

    fn resolve_id(&self, name: &Option<String>) -> Result<Option<PolicyListId>, CodecError> {
        name.as_deref().map(|n| self.id_of(n)).transpose()
    }

    fn resolve_name(&self, id: Option<PolicyListId>) -> Result<Option<String>, CodecError> {
        id.map(|i| self.name_of(i)).transpose()
    }
}

/// Where a side lands and what it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPartner {
    pub payload: PartnerPayload,
    /// The provider port for cloud kinds, otherwise the requested attachment.
    pub attachment: AttachmentUid,
}

/// Inputs to [`encode`] that come from the rest of the circuit.
#[derive(Debug, Clone, Copy)]
pub struct EncodeContext<'a> {
    /// Attachment the side is requested on; the owning router for router
    /// kinds.
    pub attachment: &'a AttachmentUid,
    /// Resolved attachment of the opposite side, once known.
    pub opposite: Option<&'a AttachmentUid>,
}

/// Provider port lookup a cloud kind needs, if any.
///
/// AWS and IBM land directly on the port the user requested; the other
/// providers are addressed by key.
pub fn partner_port_query(config: &PartnerConfig) -> Option<PartnerPortQuery> {
    match config {
        PartnerConfig::Azure(c) => Some(PartnerPortQuery {
            provider: CloudProvider::Azure,
            key: c.service_key.clone(),
            selector: Some(c.port_choice),
        }),
        PartnerConfig::Google(c) => Some(PartnerPortQuery {
            provider: CloudProvider::Google,
            key: c.pairing_key.clone(),
            selector: None,
        }),
        PartnerConfig::Oracle(c) => Some(PartnerPortQuery {
            provider: CloudProvider::Oracle,
            key: c.virtual_circuit_id.clone(),
            selector: None,
        }),
        _ => None,
    }
}

/// Encodes a partner configuration, performing any lookups it needs.
pub async fn encode(
    api: &dyn FabricApi,
    config: &PartnerConfig,
    ctx: EncodeContext<'_>,
) -> Result<EncodedPartner, CodecError> {
    let attachment = match partner_port_query(config) {
        Some(query) => {
            let port = api.lookup_partner_port(&query).await.map_err(|source| {
                CodecError::PartnerPortLookup {
                    provider: query.provider,
                    key: query.key.clone(),
                    source,
                }
            })?;
            debug_log!(
                "PartnerCodec",
                provider = %query.provider,
                port = %port.product_uid,
                "resolved partner port"
            );
            port.product_uid
        }
        None => ctx.attachment.clone(),
    };

    let owner = RouterUid::from(ctx.attachment);
    let lists = match config.kind() {
        PartnerKind::Vrouter | PartnerKind::RouterToRouter => {
            PolicyListIndex::fetch(api, &owner).await?
        }
        _ => PolicyListIndex::empty(&owner),
    };

    let payload = encode_payload(config, &lists, ctx.opposite)?;
    Ok(EncodedPartner {
        payload,
        attachment,
    })
}

/// Builds the wire payload from already-resolved inputs.
pub fn encode_payload(
    config: &PartnerConfig,
    lists: &PolicyListIndex,
    opposite: Option<&AttachmentUid>,
) -> Result<PartnerPayload, CodecError> {
    let payload = match config {
        PartnerConfig::Aws(c) => PartnerPayload::Aws(aws_payload(c)),
        PartnerConfig::Azure(c) => PartnerPayload::Azure(azure_payload(c)),
        PartnerConfig::Google(c) => PartnerPayload::Google(GooglePayload {
            pairing_key: c.pairing_key.clone(),
        }),
        PartnerConfig::Oracle(c) => PartnerPayload::Oracle(OraclePayload {
            virtual_circuit_id: c.virtual_circuit_id.clone(),
        }),
        PartnerConfig::Ibm(c) => PartnerPayload::Ibm(ibm_payload(c)),
        PartnerConfig::Transit => PartnerPayload::Transit,
        PartnerConfig::Vrouter(c) => PartnerPayload::Vrouter(VrouterPayload {
            interfaces: encode_interfaces(&c.interfaces, lists)?,
        }),
        PartnerConfig::RouterToRouter(c) => {
            let peer_router_uid = match (&c.peer_router_id, opposite) {
                (Some(id), _) => RouterUid::new(id.as_str()),
                (None, Some(opposite)) => RouterUid::from(opposite),
                (None, None) => return Err(CodecError::MissingPeerRouter),
            };
            PartnerPayload::RouterToRouter(RouterToRouterPayload {
                peer_router_uid,
                interfaces: encode_interfaces(&c.interfaces, lists)?,
            })
        }
    };
    Ok(payload)
}

/// Kind of a wire payload.
pub fn payload_kind(payload: &PartnerPayload) -> PartnerKind {
    match payload {
        PartnerPayload::Aws(_) => PartnerKind::Aws,
        PartnerPayload::Azure(_) => PartnerKind::Azure,
        PartnerPayload::Google(_) => PartnerKind::Google,
        PartnerPayload::Oracle(_) => PartnerKind::Oracle,
        PartnerPayload::Ibm(_) => PartnerKind::Ibm,
        PartnerPayload::Transit => PartnerKind::Transit,
        PartnerPayload::Vrouter(_) => PartnerKind::Vrouter,
        PartnerPayload::RouterToRouter(_) => PartnerKind::RouterToRouter,
    }
}

/// Returns true if decoding `payload` needs the owning router's lists.
pub fn references_policy_lists(payload: &PartnerPayload) -> bool {
    let interfaces = match payload {
        PartnerPayload::Vrouter(p) => &p.interfaces,
        PartnerPayload::RouterToRouter(p) => &p.interfaces,
        _ => return false,
    };
    interfaces
        .iter()
        .flat_map(|i| i.bgp_connections.iter())
        .any(|b| {
            b.import_permit_list_id.is_some()
                || b.import_deny_list_id.is_some()
                || b.export_permit_list_id.is_some()
                || b.export_deny_list_id.is_some()
        })
}

/// Decodes a non-cloud payload. Cloud payloads yield `None`.
pub fn decode_payload(
    payload: &PartnerPayload,
    lists: &PolicyListIndex,
) -> Result<Option<PartnerConfig>, CodecError> {
    let config = match payload {
        PartnerPayload::Transit => PartnerConfig::Transit,
        PartnerPayload::Vrouter(p) => PartnerConfig::Vrouter(VrouterConfig {
            interfaces: decode_interfaces(&p.interfaces, lists)?,
        }),
        PartnerPayload::RouterToRouter(p) => PartnerConfig::RouterToRouter(RouterToRouterConfig {
            peer_router_id: Some(p.peer_router_uid.as_str().to_string()),
            interfaces: decode_interfaces(&p.interfaces, lists)?,
        }),
        PartnerPayload::Aws(_)
        | PartnerPayload::Azure(_)
        | PartnerPayload::Google(_)
        | PartnerPayload::Oracle(_)
        | PartnerPayload::Ibm(_) => return Ok(None),
    };
    Ok(Some(config))
}

/// Merges the remote payload of one side into its tracked value.
///
/// A tracked cloud configuration is kept as long as the remote side still
/// reports the same cloud kind (or reports nothing).
pub fn decode(
    payload: Option<&PartnerPayload>,
    tracked: Option<&PartnerConfig>,
    lists: &PolicyListIndex,
) -> Result<Option<PartnerConfig>, CodecError> {
    let tracked_cloud = tracked.filter(|t| t.is_cloud());
    match payload {
        Some(payload) if payload_kind(payload).is_cloud() => Ok(tracked_cloud
            .filter(|t| t.kind() == payload_kind(payload))
            .cloned()),
        Some(payload) => decode_payload(payload, lists),
        None => Ok(tracked_cloud.cloned()),
    }
}

fn aws_payload(c: &AwsConfig) -> AwsPayload {
    AwsPayload {
        kind: c.connection_kind,
        owner_account: c.owner_account.clone(),
        name: c.name.clone(),
        asn: c.asn,
        amazon_asn: c.amazon_asn,
        auth_key: c.auth_key.clone(),
        prefixes: c.prefixes.clone(),
        customer_ip_address: c.customer_ip_address.clone(),
        amazon_ip_address: c.amazon_ip_address.clone(),
    }
}

fn azure_payload(c: &AzureConfig) -> AzurePayload {
    AzurePayload {
        service_key: c.service_key.clone(),
        peers: c.peers.iter().map(azure_peering).collect(),
    }
}

fn azure_peering(p: &AzurePeeringConfig) -> AzurePeering {
    AzurePeering {
        peer_type: p.peer_type.clone(),
        peer_asn: p.peer_asn,
        primary_subnet: p.primary_subnet.clone(),
        secondary_subnet: p.secondary_subnet.clone(),
        prefixes: p.prefixes.clone(),
        shared_key: p.shared_key.clone(),
        vlan: p.vlan,
    }
}

fn ibm_payload(c: &IbmConfig) -> IbmPayload {
    IbmPayload {
        account_id: c.account_id.clone(),
        name: c.name.clone(),
        customer_asn: c.customer_asn,
        customer_ip_address: c.customer_ip_address.clone(),
        provider_ip_address: c.provider_ip_address.clone(),
    }
}

fn encode_interfaces(
    interfaces: &[RouterInterfaceConfig],
    lists: &PolicyListIndex,
) -> Result<Vec<RouterInterfacePayload>, CodecError> {
    interfaces
        .iter()
        .map(|i| -> Result<RouterInterfacePayload, CodecError> {
            Ok(RouterInterfacePayload {
                ip_addresses: i.ip_addresses.clone(),
                ip_routes: i
                    .ip_routes
                    .iter()
                    .map(|r| IpRoutePayload {
                        prefix: r.prefix.clone(),
                        next_hop: r.next_hop.clone(),
                        description: r.description.clone(),
                    })
                    .collect(),
                nat_ip_addresses: i.nat_ip_addresses.clone(),
                bfd: i.bfd.as_ref().map(|b| BfdPayload {
                    tx_interval: b.tx_interval,
                    rx_interval: b.rx_interval,
                    multiplier: b.multiplier,
                }),
                vlan: i.vlan,
                bgp_connections: i
                    .bgp_connections
                    .iter()
                    .map(|b| encode_bgp(b, lists))
                    .collect::<Result<_, _>>()?,
            })
        })
        .collect()
}

fn encode_bgp(
    b: &BgpConnectionConfig,
    lists: &PolicyListIndex,
) -> Result<BgpConnectionPayload, CodecError> {
    Ok(BgpConnectionPayload {
        peer_asn: b.peer_asn,
        local_asn: b.local_asn,
        local_ip_address: b.local_ip_address.clone(),
        peer_ip_address: b.peer_ip_address.clone(),
        password: b.password.clone(),
        shutdown: b.shutdown,
        description: b.description.clone(),
        med_in: b.med_in,
        med_out: b.med_out,
        bfd_enabled: b.bfd_enabled,
        export_policy: b.export_policy.clone(),
        import_permit_list_id: lists.resolve_id(&b.import_permit_list)?,
        import_deny_list_id: lists.resolve_id(&b.import_deny_list)?,
        export_permit_list_id: lists.resolve_id(&b.export_permit_list)?,
        export_deny_list_id: lists.resolve_id(&b.export_deny_list)?,
        permit_export_to: b.permit_export_to.clone(),
        deny_export_to: b.deny_export_to.clone(),
    })
}

fn decode_interfaces(
    interfaces: &[RouterInterfacePayload],
    lists: &PolicyListIndex,
) -> Result<Vec<RouterInterfaceConfig>, CodecError> {
    interfaces
        .iter()
        .map(|i| -> Result<RouterInterfaceConfig, CodecError> {
            Ok(RouterInterfaceConfig {
                ip_addresses: i.ip_addresses.clone(),
                ip_routes: i
                    .ip_routes
                    .iter()
                    .map(|r| IpRouteConfig {
                        prefix: r.prefix.clone(),
                        next_hop: r.next_hop.clone(),
                        description: r.description.clone(),
                    })
                    .collect(),
                nat_ip_addresses: i.nat_ip_addresses.clone(),
                bfd: i.bfd.as_ref().map(|b| BfdConfig {
                    tx_interval: b.tx_interval,
                    rx_interval: b.rx_interval,
                    multiplier: b.multiplier,
                }),
                vlan: i.vlan,
                bgp_connections: i
                    .bgp_connections
                    .iter()
                    .map(|b| decode_bgp(b, lists))
                    .collect::<Result<_, _>>()?,
            })
        })
        .collect()
}

fn decode_bgp(
    b: &BgpConnectionPayload,
    lists: &PolicyListIndex,
) -> Result<BgpConnectionConfig, CodecError> {
    Ok(BgpConnectionConfig {
        peer_asn: b.peer_asn,
        local_asn: b.local_asn,
        local_ip_address: b.local_ip_address.clone(),
        peer_ip_address: b.peer_ip_address.clone(),
        password: b.password.clone(),
        shutdown: b.shutdown,
        description: b.description.clone(),
        med_in: b.med_in,
        med_out: b.med_out,
        bfd_enabled: b.bfd_enabled,
        export_policy: b.export_policy.clone(),
        import_permit_list: lists.resolve_name(b.import_permit_list_id)?,
        import_deny_list: lists.resolve_name(b.import_deny_list_id)?,
        export_permit_list: lists.resolve_name(b.export_permit_list_id)?,
        export_deny_list: lists.resolve_name(b.export_deny_list_id)?,
        permit_export_to: b.permit_export_to.clone(),
        deny_export_to: b.deny_export_to.clone(),
    })
}
