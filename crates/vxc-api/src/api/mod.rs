//! Wire shapes exchanged with the provisioning service.

pub mod circuit;
pub mod partner;
pub mod policy;
pub mod router;

pub use circuit::{
    AttachmentInfo, CircuitCreateRequest, CircuitInfo, CircuitUpdateRequest, EndpointInfo,
    EndpointRequest, EndpointUpdate, ProvisioningStatus,
};
pub use partner::{
    AwsConnectionKind, AwsPayload, AzurePayload, AzurePeering, BfdPayload, BgpConnectionPayload,
    CloudProvider, GooglePayload, IbmPayload, IpRoutePayload, OraclePayload, PartnerPayload,
    PartnerPort, PartnerPortQuery, PortSelector, RouterInterfacePayload, RouterToRouterPayload,
    VrouterPayload,
};
pub use policy::{PolicyAction, PolicyEntryPayload, PolicyListPayload, PolicyListSummary};
pub use router::{RouterCreateRequest, RouterInfo, RouterUpdateRequest};
