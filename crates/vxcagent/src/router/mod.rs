//! Virtual routers that own routing-policy lists.

pub mod orch;
pub mod types;

pub use orch::{RouterOrch, RouterOrchError, RouterOrchStats};
pub use types::VirtualRouter;
