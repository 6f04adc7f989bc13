//! The remote provisioning API as seen by the reconciler.

use async_trait::async_trait;

use crate::api::{
    AttachmentInfo, CircuitCreateRequest, CircuitInfo, CircuitUpdateRequest, PartnerPort,
    PartnerPortQuery, PolicyListPayload, PolicyListSummary, RouterCreateRequest, RouterInfo,
    RouterUpdateRequest,
};
use crate::error::ApiResult;
use crate::types::{AttachmentUid, CircuitUid, PolicyListId, RouterUid};

/// Operations the reconciler consumes from the provisioning service.
///
/// Implementations own transport, authentication, timeouts and any retry
/// policy. Every method maps a missing object to [`crate::ApiError::NotFound`].
///
/// # Thread Safety
///
/// The routing-policy synchronizer calls into one client from many
/// concurrent tasks, so implementations must be `Send + Sync`.
#[async_trait]
pub trait FabricApi: Send + Sync {
    /// Orders a circuit; returns its UID once the order is accepted.
    async fn create_circuit(&self, request: &CircuitCreateRequest) -> ApiResult<CircuitUid>;

    async fn get_circuit(&self, uid: &CircuitUid) -> ApiResult<CircuitInfo>;

    async fn update_circuit(
        &self,
        uid: &CircuitUid,
        request: &CircuitUpdateRequest,
    ) -> ApiResult<()>;

    async fn delete_circuit(&self, uid: &CircuitUid) -> ApiResult<()>;

    /// Reports the product type behind an attachment UID.
    async fn lookup_attachment(&self, uid: &AttachmentUid) -> ApiResult<AttachmentInfo>;

    /// Finds the provider-facing port for a cloud partner key.
    async fn lookup_partner_port(&self, query: &PartnerPortQuery) -> ApiResult<PartnerPort>;

    async fn list_policy_lists(&self, router: &RouterUid) -> ApiResult<Vec<PolicyListSummary>>;

    async fn get_policy_list(
        &self,
        router: &RouterUid,
        id: PolicyListId,
    ) -> ApiResult<PolicyListPayload>;

    /// Creates a list; the returned payload carries the assigned id.
    async fn create_policy_list(
        &self,
        router: &RouterUid,
        list: &PolicyListPayload,
    ) -> ApiResult<PolicyListPayload>;

    async fn update_policy_list(
        &self,
        router: &RouterUid,
        id: PolicyListId,
        list: &PolicyListPayload,
    ) -> ApiResult<PolicyListPayload>;

    async fn delete_policy_list(&self, router: &RouterUid, id: PolicyListId) -> ApiResult<()>;

    async fn create_router(&self, request: &RouterCreateRequest) -> ApiResult<RouterUid>;

    async fn get_router(&self, uid: &RouterUid) -> ApiResult<RouterInfo>;

    async fn update_router(&self, uid: &RouterUid, request: &RouterUpdateRequest)
        -> ApiResult<()>;

    async fn delete_router(&self, uid: &RouterUid) -> ApiResult<()>;
}
