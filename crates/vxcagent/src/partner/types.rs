//! Declarative partner configuration.
//!
//! In documents a partner configuration is a block with one optional
//! sub-block per variant (`aws`, `azure`, ..., `router_to_router`). It is
//! converted into [`PartnerConfig`] while deserializing, so "exactly one
//! variant" holds for every value the reconciler ever sees.

use serde::{Deserialize, Serialize};
use std::fmt;
use vxc_api::api::{AwsConnectionKind, CloudProvider, PortSelector};

use crate::error::ValidationError;

/// Kind of partner configuration, without its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartnerKind {
    Aws,
    Azure,
    Google,
    Oracle,
    Ibm,
    Transit,
    Vrouter,
    RouterToRouter,
}

impl PartnerKind {
    /// Cloud kinds are provisioned partly by the provider; their payload is
    /// opaque once created.
    pub const fn is_cloud(&self) -> bool {
        self.provider().is_some()
    }

    pub const fn provider(&self) -> Option<CloudProvider> {
        match self {
            PartnerKind::Aws => Some(CloudProvider::Aws),
            PartnerKind::Azure => Some(CloudProvider::Azure),
            PartnerKind::Google => Some(CloudProvider::Google),
            PartnerKind::Oracle => Some(CloudProvider::Oracle),
            PartnerKind::Ibm => Some(CloudProvider::Ibm),
            PartnerKind::Transit | PartnerKind::Vrouter | PartnerKind::RouterToRouter => None,
        }
    }

    /// Name of the document block carrying this kind.
    pub const fn block_name(&self) -> &'static str {
        match self {
            PartnerKind::Aws => "aws",
            PartnerKind::Azure => "azure",
            PartnerKind::Google => "google",
            PartnerKind::Oracle => "oracle",
            PartnerKind::Ibm => "ibm",
            PartnerKind::Transit => "transit",
            PartnerKind::Vrouter => "vrouter",
            PartnerKind::RouterToRouter => "router_to_router",
        }
    }
}

impl fmt::Display for PartnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.block_name())
    }
}

/// Partner configuration of one circuit side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PartnerConfigBlocks", into = "PartnerConfigBlocks")]
pub enum PartnerConfig {
    Aws(AwsConfig),
    Azure(AzureConfig),
    Google(GoogleConfig),
    Oracle(OracleConfig),
    Ibm(IbmConfig),
    Transit,
    Vrouter(VrouterConfig),
    RouterToRouter(RouterToRouterConfig),
}

impl PartnerConfig {
    pub fn kind(&self) -> PartnerKind {
        match self {
            PartnerConfig::Aws(_) => PartnerKind::Aws,
            PartnerConfig::Azure(_) => PartnerKind::Azure,
            PartnerConfig::Google(_) => PartnerKind::Google,
            PartnerConfig::Oracle(_) => PartnerKind::Oracle,
            PartnerConfig::Ibm(_) => PartnerKind::Ibm,
            PartnerConfig::Transit => PartnerKind::Transit,
            PartnerConfig::Vrouter(_) => PartnerKind::Vrouter,
            PartnerConfig::RouterToRouter(_) => PartnerKind::RouterToRouter,
        }
    }

    pub fn is_cloud(&self) -> bool {
        self.kind().is_cloud()
    }
}

fn default_aws_kind() -> AwsConnectionKind {
    AwsConnectionKind::HostedVif
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    #[serde(default = "default_aws_kind")]
    pub connection_kind: AwsConnectionKind,
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
#[serde(deny_unknown_fields)]
pub struct AzurePeeringConfig {
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
#[serde(deny_unknown_fields)]
pub struct AzureConfig {
    pub service_key: String,
    /// Which port of the provider's redundant pair to land on.
    #[serde(default)]
    pub port_choice: PortSelector,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peers: Vec<AzurePeeringConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleConfig {
    pub pairing_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OracleConfig {
    pub virtual_circuit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IbmConfig {
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
#[serde(deny_unknown_fields)]
pub struct BfdConfig {
    pub tx_interval: u32,
    pub rx_interval: u32,
    pub multiplier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpRouteConfig {
    pub prefix: String,
    pub next_hop: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A BGP session. Routing-policy lists are named by their description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BgpConnectionConfig {
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
    pub import_permit_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_deny_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_permit_list: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_deny_list: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permit_export_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deny_export_to: Vec<String>,
}

impl BgpConnectionConfig {
    /// Every policy-list name this session references.
    pub fn list_references(&self) -> impl Iterator<Item = &str> {
        [
            &self.import_permit_list,
            &self.import_deny_list,
            &self.export_permit_list,
            &self.export_deny_list,
        ]
        .into_iter()
        .filter_map(|name| name.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouterInterfaceConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ip_routes: Vec<IpRouteConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nat_ip_addresses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bfd: Option<BfdConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan: Option<u16>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bgp_connections: Vec<BgpConnectionConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VrouterConfig {
    #[serde(default)]
    pub interfaces: Vec<RouterInterfaceConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterToRouterConfig {
    /// Defaults to the router on the opposite side of the circuit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_router_id: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<RouterInterfaceConfig>,
}

/// Empty marker block for `transit: {}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransitConfig {}

/// Document form: one optional block per variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerConfigBlocks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle: Option<OracleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibm: Option<IbmConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit: Option<TransitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vrouter: Option<VrouterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub router_to_router: Option<RouterToRouterConfig>,
}

impl PartnerConfigBlocks {
    fn populated(&self) -> Vec<PartnerKind> {
        let mut kinds = Vec::new();
        if self.aws.is_some() {
            kinds.push(PartnerKind::Aws);
        }
        if self.azure.is_some() {
            kinds.push(PartnerKind::Azure);
        }
        if self.google.is_some() {
            kinds.push(PartnerKind::Google);
        }
        if self.oracle.is_some() {
            kinds.push(PartnerKind::Oracle);
        }
        if self.ibm.is_some() {
            kinds.push(PartnerKind::Ibm);
        }
        if self.transit.is_some() {
            kinds.push(PartnerKind::Transit);
        }
        if self.vrouter.is_some() {
            kinds.push(PartnerKind::Vrouter);
        }
        if self.router_to_router.is_some() {
            kinds.push(PartnerKind::RouterToRouter);
        }
        kinds
    }
}

impl TryFrom<PartnerConfigBlocks> for PartnerConfig {
    type Error = ValidationError;

    fn try_from(blocks: PartnerConfigBlocks) -> Result<Self, Self::Error> {
        let populated = blocks.populated();
        if populated.len() > 1 {
            return Err(ValidationError::MultiplePartnerVariants(
                populated.iter().map(|kind| kind.to_string()).collect(),
            ));
        }

        let PartnerConfigBlocks {
            aws,
            azure,
            google,
            oracle,
            ibm,
            transit,
            vrouter,
            router_to_router,
        } = blocks;

        if let Some(config) = aws {
            return Ok(PartnerConfig::Aws(config));
        }
        if let Some(config) = azure {
            return Ok(PartnerConfig::Azure(config));
        }
        if let Some(config) = google {
            return Ok(PartnerConfig::Google(config));
        }
        if let Some(config) = oracle {
            return Ok(PartnerConfig::Oracle(config));
        }
        if let Some(config) = ibm {
            return Ok(PartnerConfig::Ibm(config));
        }
        if transit.is_some() {
            return Ok(PartnerConfig::Transit);
        }
        if let Some(config) = vrouter {
            return Ok(PartnerConfig::Vrouter(config));
        }
        if let Some(config) = router_to_router {
            return Ok(PartnerConfig::RouterToRouter(config));
        }
        Err(ValidationError::MissingPartnerVariant)
    }
}

impl From<PartnerConfig> for PartnerConfigBlocks {
    fn from(config: PartnerConfig) -> Self {
        let mut blocks = PartnerConfigBlocks::default();
        match config {
            PartnerConfig::Aws(c) => blocks.aws = Some(c),
            PartnerConfig::Azure(c) => blocks.azure = Some(c),
            PartnerConfig::Google(c) => blocks.google = Some(c),
            PartnerConfig::Oracle(c) => blocks.oracle = Some(c),
            PartnerConfig::Ibm(c) => blocks.ibm = Some(c),
            PartnerConfig::Transit => blocks.transit = Some(TransitConfig {}),
            PartnerConfig::Vrouter(c) => blocks.vrouter = Some(c),
            PartnerConfig::RouterToRouter(c) => blocks.router_to_router = Some(c),
        }
        blocks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_block_accepted() {
        let config: PartnerConfig =
            serde_yaml::from_str("google:\n  pairing_key: pk-1/us-east4/1\n").unwrap();
        assert_eq!(
            config,
            PartnerConfig::Google(GoogleConfig {
                pairing_key: "pk-1/us-east4/1".to_string()
            })
        );
        assert!(config.is_cloud());
    }

    #[test]
    fn test_transit_block() {
        let config: PartnerConfig = serde_yaml::from_str("transit: {}\n").unwrap();
        assert_eq!(config, PartnerConfig::Transit);
        assert!(!config.is_cloud());

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert_eq!(yaml.trim(), "transit: {}");
    }

    #[test]
    fn test_no_block_rejected() {
        let err = serde_yaml::from_str::<PartnerConfig>("{}").unwrap_err();
        assert!(err.to_string().contains("none set"), "{}", err);
    }

    #[test]
    fn test_two_blocks_rejected() {
        let raw = "google:\n  pairing_key: pk\noracle:\n  virtual_circuit_id: ocid1\n";
        let err = serde_yaml::from_str::<PartnerConfig>(raw).unwrap_err();
        assert!(err.to_string().contains("google, oracle"), "{}", err);
    }

    #[test]
    fn test_azure_selector_defaults_to_primary() {
        let config: PartnerConfig =
            serde_yaml::from_str("azure:\n  service_key: sk-1\n").unwrap();
        let PartnerConfig::Azure(azure) = config else {
            panic!("expected azure");
        };
        assert_eq!(azure.port_choice, PortSelector::Primary);
    }

    #[test]
    fn test_kind_classification() {
        assert!(PartnerKind::Azure.is_cloud());
        assert!(PartnerKind::Ibm.is_cloud());
        assert!(!PartnerKind::Transit.is_cloud());
        assert!(!PartnerKind::RouterToRouter.is_cloud());
        assert_eq!(PartnerKind::RouterToRouter.to_string(), "router_to_router");
    }
}
