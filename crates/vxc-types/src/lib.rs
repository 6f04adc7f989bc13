//! Common network types for virtual circuit reconciliation.
//!
//! This crate provides type-safe representations of the primitives shared by
//! the API contract and the reconciler:
//!
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`VlanTag`]: endpoint tagging (untagged, auto-assign, or an explicit VLAN)
//! - [`IpAddress`]: IPv4 and IPv6 addresses
//! - [`IpPrefix`]: IP network prefixes (CIDR notation)
//! - [`AddressFamily`]: IPv4 / IPv6 selector for routing-policy lists
//! - [`AttachmentCategory`]: what kind of attachment point an endpoint lands on

mod category;
mod ip;
mod vlan;

pub use category::AttachmentCategory;
pub use ip::{AddressFamily, IpAddress, IpPrefix};
pub use vlan::{VlanId, VlanTag};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(i32),

    #[error("invalid address family: {0}")]
    InvalidAddressFamily(String),

    #[error("invalid attachment category: {0}")]
    InvalidCategory(String),
}
