//! VLAN ID and endpoint tagging types with validation.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// # Examples
///
/// ```
/// use vxc_types::VlanId;
///
/// let vlan = VlanId::new(100).unwrap();
/// assert_eq!(vlan.as_u16(), 100);
///
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    /// Creates a new VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the VLAN ID is not in the valid range (1-4094).
    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id as i32))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

/// Tagging requested for one side of a circuit.
///
/// On the wire this is a single integer: `-1` untagged, `0` asks the remote
/// system to pick a free VLAN, anything else is an explicit VLAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum VlanTag {
    Untagged,
    AutoAssign,
    Tagged(VlanId),
}

impl VlanTag {
    pub const UNTAGGED: i32 = -1;
    pub const AUTO_ASSIGN: i32 = 0;

    /// Converts to the wire integer.
    pub const fn to_raw(self) -> i32 {
        match self {
            VlanTag::Untagged => Self::UNTAGGED,
            VlanTag::AutoAssign => Self::AUTO_ASSIGN,
            VlanTag::Tagged(id) => id.as_u16() as i32,
        }
    }

    /// Parses the wire integer.
    pub fn from_raw(raw: i32) -> Result<Self, ParseError> {
        match raw {
            Self::UNTAGGED => Ok(VlanTag::Untagged),
            Self::AUTO_ASSIGN => Ok(VlanTag::AutoAssign),
            id if (1..=i32::from(VlanId::MAX)).contains(&id) => {
                Ok(VlanTag::Tagged(VlanId(id as u16)))
            }
            other => Err(ParseError::InvalidVlanId(other)),
        }
    }
}

impl fmt::Display for VlanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VlanTag::Untagged => write!(f, "untagged"),
            VlanTag::AutoAssign => write!(f, "auto"),
            VlanTag::Tagged(id) => write!(f, "{}", id),
        }
    }
}

impl FromStr for VlanTag {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "untagged" => Ok(VlanTag::Untagged),
            "auto" => Ok(VlanTag::AutoAssign),
            other => {
                let raw: i32 = other.parse().map_err(|_| ParseError::InvalidVlanId(0))?;
                VlanTag::from_raw(raw)
            }
        }
    }
}

impl TryFrom<i32> for VlanTag {
    type Error = ParseError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        VlanTag::from_raw(raw)
    }
}

impl From<VlanTag> for i32 {
    fn from(tag: VlanTag) -> i32 {
        tag.to_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vlan_id_range() {
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(4094).is_ok());
        assert_eq!(VlanId::new(0), Err(ParseError::InvalidVlanId(0)));
        assert_eq!(VlanId::new(4095), Err(ParseError::InvalidVlanId(4095)));
    }

    #[test]
    fn test_vlan_tag_sentinels() {
        assert_eq!(VlanTag::from_raw(-1).unwrap(), VlanTag::Untagged);
        assert_eq!(VlanTag::from_raw(0).unwrap(), VlanTag::AutoAssign);
        assert_eq!(
            VlanTag::from_raw(100).unwrap(),
            VlanTag::Tagged(VlanId::new(100).unwrap())
        );
        assert!(VlanTag::from_raw(-2).is_err());
        assert!(VlanTag::from_raw(4095).is_err());
    }

    #[test]
    fn test_vlan_tag_parse() {
        assert_eq!("auto".parse::<VlanTag>().unwrap(), VlanTag::AutoAssign);
        assert_eq!("UNTAGGED".parse::<VlanTag>().unwrap(), VlanTag::Untagged);
        assert_eq!("300".parse::<VlanTag>().unwrap().to_raw(), 300);
        assert!("vlan".parse::<VlanTag>().is_err());
    }

    #[test]
    fn test_vlan_tag_serde_as_integer() {
        let tag = VlanTag::Tagged(VlanId::new(42).unwrap());
        assert_eq!(serde_json::to_string(&tag).unwrap(), "42");
        assert_eq!(serde_json::to_string(&VlanTag::AutoAssign).unwrap(), "0");
        assert_eq!(
            serde_json::from_str::<VlanTag>("-1").unwrap(),
            VlanTag::Untagged
        );
    }

    #[test]
    fn test_documents_use_integers_not_words() {
        assert!(serde_json::from_str::<VlanTag>("\"auto\"").is_err());
        assert!(serde_json::from_str::<VlanTag>("\"untagged\"").is_err());
        assert!(serde_json::from_str::<VlanTag>("4095").is_err());
        assert_eq!(
            serde_json::from_str::<Vec<VlanTag>>("[-1, 0, 4094]").unwrap(),
            vec![
                VlanTag::Untagged,
                VlanTag::AutoAssign,
                VlanTag::Tagged(VlanId::new(4094).unwrap())
            ]
        );
    }
}
