//! Remote provisioning API contract.
//!
//! The reconciler never speaks HTTP itself. Everything it needs from the
//! provisioning service is expressed by the [`FabricApi`] trait and the wire
//! shapes in [`api`]; a concrete HTTP client (or the in-memory mock used in
//! tests) implements the trait.
//!
//! - [`types`]: type-safe product identifiers
//! - [`error`]: error type and HTTP status mapping
//! - [`api`]: request/response shapes for circuits, partner payloads,
//!   routing-policy lists and virtual routers
//! - [`client`]: the [`FabricApi`] trait
//!
//! # Example
//!
//! ```ignore
//! use vxc_api::{ApiResult, CircuitUid, FabricApi};
//!
//! async fn status(api: &dyn FabricApi, uid: &CircuitUid) -> ApiResult<String> {
//!     let info = api.get_circuit(uid).await?;
//!     Ok(info.provisioning_status.to_string())
//! }
//! ```

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::FabricApi;
pub use error::{ApiError, ApiResult};
pub use types::{
    AttachmentKind, AttachmentUid, CircuitKind, CircuitUid, PolicyListId, ProductKind,
    ProductUid, RouterKind, RouterUid,
};
