//! Test infrastructure for the virtual circuit reconciler.
//!
//! Provides:
//! - [`MockFabric`]: an in-memory provisioning service implementing
//!   [`vxc_api::FabricApi`], with a call journal and fault injection
//! - fixtures for seeding attachments, partner ports, routers and
//!   routing-policy lists

pub mod fixtures;
mod mock;

pub use fixtures::*;
pub use mock::{MockCall, MockFabric, MockOp};
