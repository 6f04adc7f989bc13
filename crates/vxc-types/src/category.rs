//! Attachment point categories.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of attachment point a circuit endpoint lands on.
///
/// `Unknown` is a real answer, not an error: it is what the classifier
/// returns when the lookup fails, leaving validation to the remote system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentCategory {
    /// Physical port (including provider-facing partner ports).
    Port,
    /// Virtual router instance.
    VirtualRouter,
    /// Virtual appliance (network function VM).
    VirtualAppliance,
    /// Lookup failed or returned an unrecognized product type.
    #[default]
    Unknown,
}

impl AttachmentCategory {
    /// Maps the remote product-type string to a category.
    ///
    /// Unrecognized product types map to `Unknown`.
    pub fn from_product_type(product_type: &str) -> Self {
        match product_type.to_ascii_uppercase().as_str() {
            "PORT" | "LAG" => AttachmentCategory::Port,
            "VROUTER" | "ROUTER" => AttachmentCategory::VirtualRouter,
            "APPLIANCE" | "NFV" => AttachmentCategory::VirtualAppliance,
            _ => AttachmentCategory::Unknown,
        }
    }
}

impl fmt::Display for AttachmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AttachmentCategory::Port => "port",
            AttachmentCategory::VirtualRouter => "virtual_router",
            AttachmentCategory::VirtualAppliance => "virtual_appliance",
            AttachmentCategory::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for AttachmentCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "port" => Ok(AttachmentCategory::Port),
            "virtual_router" | "vrouter" => Ok(AttachmentCategory::VirtualRouter),
            "virtual_appliance" | "appliance" => Ok(AttachmentCategory::VirtualAppliance),
            "unknown" => Ok(AttachmentCategory::Unknown),
            _ => Err(ParseError::InvalidCategory(s.to_string())),
        }
    }
}
