//! Type-safe product identifier wrappers.
//!
//! The provisioning service identifies every product by an opaque string
//! UID. Wrapping them in a kind-tagged type keeps a router UID from being
//! passed where a circuit UID is expected.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

/// Numeric identifier the service assigns to a routing-policy list.
pub type PolicyListId = u64;

/// Marker trait for product kinds.
pub trait ProductKind: Send + Sync + 'static {
    /// Returns the product kind name for debugging.
    fn kind_name() -> &'static str;
}

/// A kind-tagged product UID.
///
/// # Examples
///
/// ```
/// use vxc_api::{CircuitUid, RouterUid};
///
/// let circuit = CircuitUid::new("c-1234");
/// let router = RouterUid::new("r-1");
/// assert_eq!(circuit.as_str(), "c-1234");
///
/// // This would fail to compile:
/// // fn takes_circuit(c: &CircuitUid) {}
/// // takes_circuit(&router);
/// # let _ = router;
/// ```
pub struct ProductUid<T: ProductKind> {
    raw: String,
    _marker: PhantomData<T>,
}

impl<T: ProductKind> ProductUid<T> {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn into_string(self) -> String {
        self.raw
    }

    /// Returns true if the UID is empty (never assigned).
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

impl<T: ProductKind> Clone for ProductUid<T> {
    fn clone(&self) -> Self {
        Self::new(self.raw.clone())
    }
}

impl<T: ProductKind> fmt::Debug for ProductUid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::kind_name(), self.raw)
    }
}

impl<T: ProductKind> fmt::Display for ProductUid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl<T: ProductKind> PartialEq for ProductUid<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T: ProductKind> Eq for ProductUid<T> {}

impl<T: ProductKind> Hash for ProductUid<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T: ProductKind> From<&str> for ProductUid<T> {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl<T: ProductKind> From<String> for ProductUid<T> {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl<T: ProductKind> Serialize for ProductUid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de, T: ProductKind> Deserialize<'de> for ProductUid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

macro_rules! product_kind {
    ($kind:ident, $alias:ident, $name:literal) => {
        #[derive(Debug, Clone, Copy)]
        pub enum $kind {}

        impl ProductKind for $kind {
            fn kind_name() -> &'static str {
                $name
            }
        }

        pub type $alias = ProductUid<$kind>;
    };
}

product_kind!(CircuitKind, CircuitUid, "Circuit");
product_kind!(RouterKind, RouterUid, "Router");
product_kind!(AttachmentKind, AttachmentUid, "Attachment");

impl From<&RouterUid> for AttachmentUid {
    fn from(router: &RouterUid) -> Self {
        AttachmentUid::new(router.as_str())
    }
}

impl From<&AttachmentUid> for RouterUid {
    fn from(attachment: &AttachmentUid) -> Self {
        RouterUid::new(attachment.as_str())
    }
}
