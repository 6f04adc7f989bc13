//! Routing-policy (prefix filter) list shapes.

use crate::types::PolicyListId;
use serde::{Deserialize, Serialize};
use std::fmt;
use vxc_types::AddressFamily;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Permit,
    Deny,
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyAction::Permit => f.write_str("permit"),
            PolicyAction::Deny => f.write_str("deny"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyEntryPayload {
    pub action: PolicyAction,
    pub prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<u8>,
}

/// Full routing-policy list. `id` is absent on create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PolicyListId>,
    pub description: String,
    pub address_family: AddressFamily,
    pub entries: Vec<PolicyEntryPayload>,
}

/// Listing entry returned when enumerating a router's lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyListSummary {
    pub id: PolicyListId,
    pub description: String,
    pub address_family: AddressFamily,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_list_serializes_without_id() {
        let list = PolicyListPayload {
            id: None,
            description: "customers".to_string(),
            address_family: AddressFamily::Ipv4,
            entries: vec![PolicyEntryPayload {
                action: PolicyAction::Permit,
                prefix: "10.0.0.0/8".to_string(),
                ge: Some(24),
                le: None,
            }],
        };
        let json = serde_json::to_value(&list).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["addressFamily"], "IPv4");
        assert_eq!(json["entries"][0]["action"], "permit");
        assert_eq!(json["entries"][0]["ge"], 24);
    }
}
