//! Partner configuration: declarative variants and their wire codec.

pub mod codec;
pub mod types;

pub use codec::{
    decode, decode_payload, encode, encode_payload, partner_port_query, payload_kind,
    references_policy_lists, CodecError, EncodeContext, EncodedPartner, PolicyListIndex,
};
pub use types::{
    AwsConfig, AzureConfig, AzurePeeringConfig, BfdConfig, BgpConnectionConfig, GoogleConfig,
    IbmConfig, IpRouteConfig, OracleConfig, PartnerConfig, PartnerConfigBlocks, PartnerKind,
    RouterInterfaceConfig, RouterToRouterConfig, TransitConfig, VrouterConfig,
};
