//! Routing-policy (prefix filter) lists owned by a virtual router.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use vxc_api::api::{PolicyAction, PolicyEntryPayload, PolicyListPayload};
use vxc_api::PolicyListId;
use vxc_types::{AddressFamily, IpPrefix};

use crate::error::ValidationError;

/// Entry count bounds of one list.
pub const MIN_ENTRIES: usize = 1;
pub const MAX_ENTRIES: usize = 200;

/// One permit/deny rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyEntry {
    pub action: PolicyAction,
    pub prefix: IpPrefix,
    /// Shortest matched prefix length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<u8>,
    /// Longest matched prefix length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<u8>,
}

/// Declarative routing-policy list. `id` is absent until created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingPolicyList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PolicyListId>,
    pub description: String,
    pub address_family: AddressFamily,
    pub entries: Vec<PolicyEntry>,
}

impl PolicyEntry {
    fn validate(&self, list: &str, family: AddressFamily) -> Result<(), ValidationError> {
        let prefix = self.prefix.to_string();
        if self.prefix.family() != family {
            return Err(ValidationError::FamilyMismatch {
                list: list.to_string(),
                prefix,
                family,
            });
        }

        let max = family.max_prefix_len();
        let bounds_error = |message: String| ValidationError::PrefixBounds {
            list: list.to_string(),
            prefix: prefix.clone(),
            message,
        };
        for (name, value) in [("ge", self.ge), ("le", self.le)] {
            if let Some(len) = value {
                if len > max {
                    return Err(bounds_error(format!(
                        "{} {} exceeds {} for {}",
                        name, len, max, family
                    )));
                }
            }
        }
        if let (Some(ge), Some(le)) = (self.ge, self.le) {
            if ge > le {
                return Err(bounds_error(format!("ge {} is greater than le {}", ge, le)));
            }
        }
        Ok(())
    }
}

impl RoutingPolicyList {
    /// Checks entry count, families and length bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let count = self.entries.len();
        if !(MIN_ENTRIES..=MAX_ENTRIES).contains(&count) {
            return Err(ValidationError::EntryCount {
                list: self.description.clone(),
                count,
                max: MAX_ENTRIES,
            });
        }
        for entry in &self.entries {
            entry.validate(&self.description, self.address_family)?;
        }
        Ok(())
    }

    /// Returns true if the two lists carry the same rules, ignoring ids.
    pub fn same_content(&self, other: &RoutingPolicyList) -> bool {
        self.description == other.description
            && self.address_family == other.address_family
            && self.entries == other.entries
    }

    pub fn to_payload(&self) -> PolicyListPayload {
        PolicyListPayload {
            id: self.id,
            description: self.description.clone(),
            address_family: self.address_family,
            entries: self
                .entries
                .iter()
                .map(|e| PolicyEntryPayload {
                    action: e.action,
                    prefix: e.prefix.to_string(),
                    ge: e.ge,
                    le: e.le,
                })
                .collect(),
        }
    }

    pub fn from_payload(payload: &PolicyListPayload) -> Result<Self, ValidationError> {
        let entries = payload
            .entries
            .iter()
            .map(|e| -> Result<PolicyEntry, ValidationError> {
                let prefix = e.prefix.parse::<IpPrefix>().map_err(|err| {
                    ValidationError::invalid_field(
                        format!("{}.prefix", payload.description),
                        err.to_string(),
                    )
                })?;
                Ok(PolicyEntry {
                    action: e.action,
                    prefix,
                    ge: e.ge,
                    le: e.le,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: payload.id,
            description: payload.description.clone(),
            address_family: payload.address_family,
            entries,
        })
    }
}

/// Validates every list and rejects repeated descriptions, which would make
/// name references from BGP sessions ambiguous, and repeated ids, which
/// would send two updates to the same remote list.
pub fn validate_collection(lists: &[RoutingPolicyList]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    let mut ids: HashMap<PolicyListId, &str> = HashMap::new();
    for list in lists {
        list.validate()?;
        if !seen.insert(list.description.as_str()) {
            return Err(ValidationError::DuplicatePolicyList(list.description.clone()));
        }
        if let Some(id) = list.id {
            if let Some(first) = ids.insert(id, list.description.as_str()) {
                return Err(ValidationError::DuplicatePolicyListId {
                    id,
                    first: first.to_string(),
                    second: list.description.clone(),
                });
            }
        }
    }
    Ok(())
}
