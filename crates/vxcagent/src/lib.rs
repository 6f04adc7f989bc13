//! Virtual circuit reconciler.
//!
//! Translates a declared two-sided virtual circuit, and the routing-policy
//! lists owned by a virtual router, into calls against a provisioning
//! service, and the service's authoritative state back into tracked form.
//!
//! # Architecture
//!
//! ```text
//! previous/desired ──> [classify] ──> [partner codec] ──> [endpoint reconciler]
//!                                                                │
//!                                  [CircuitOrch] <───────────────┘
//!                                        │
//!                                        ↓
//!                                  [FabricApi] <── [PolicyListSync] <── [RouterOrch]
//! ```
//!
//! # Key Components
//!
//! - [`circuit`]: declarative circuit, attachment classification, the
//!   per-side reconciler and [`circuit::CircuitOrch`]
//! - [`partner`]: partner configuration variants and their wire codec
//! - [`policy`]: routing-policy lists and the concurrent synchronizer
//! - [`router`]: virtual routers owning policy lists
//! - [`audit`]: structured audit records and logging setup
//! - [`config`]: agent configuration file

pub mod audit;
pub mod circuit;
pub mod config;
pub mod error;
pub mod partner;
pub mod policy;
pub mod router;

pub use config::AgentConfig;
pub use error::ValidationError;
