//! Input validation errors.
//!
//! Everything here is detected locally, before any remote call, and is
//! never worth retrying.

use thiserror::Error;
use vxc_api::PolicyListId;
use vxc_types::{AddressFamily, AttachmentCategory};

use crate::circuit::Side;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{side}: VLAN is not allowed on a {category} attachment")]
    VlanNotAllowed {
        side: Side,
        category: AttachmentCategory,
    },

    #[error("{side}: inner VLAN is not allowed on a {category} attachment")]
    InnerVlanNotAllowed {
        side: Side,
        category: AttachmentCategory,
    },

    #[error("{side}: vNIC index is not allowed on a {category} attachment")]
    VnicIndexNotAllowed {
        side: Side,
        category: AttachmentCategory,
    },

    #[error("{side}: a VLAN (or \"auto\") is required on a port attachment")]
    VlanRequired { side: Side },

    #[error("{side}: requested attachment identifier is empty")]
    MissingAttachment { side: Side },

    #[error("partner configuration must set exactly one variant, none set")]
    MissingPartnerVariant,

    #[error("partner configuration must set exactly one variant, found: {}", .0.join(", "))]
    MultiplePartnerVariants(Vec<String>),

    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("policy list '{list}': {count} entries, expected 1 to {max}")]
    EntryCount {
        list: String,
        count: usize,
        max: usize,
    },

    #[error("policy list '{list}': prefix {prefix} is not {family}")]
    FamilyMismatch {
        list: String,
        prefix: String,
        family: AddressFamily,
    },

    #[error("policy list '{list}': prefix {prefix}: {message}")]
    PrefixBounds {
        list: String,
        prefix: String,
        message: String,
    },

    #[error("policy list description '{0}' is used more than once")]
    DuplicatePolicyList(String),

    #[error("policy list id {id} is claimed by '{first}' and '{second}'")]
    DuplicatePolicyListId {
        id: PolicyListId,
        first: String,
        second: String,
    },
}

impl ValidationError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }
}
