//! Routing: which surfaces exist, who may see them, and where session
//! changes send the user.
//!
//! - `Route`: the application's surfaces and their paths
//! - `guard` / `resolve`: the pure gate in front of protected routes
//! - `Navigator`: history plus the navigation effects of session transitions

pub mod guard;
pub mod navigator;
pub mod route;

pub use guard::{auth_gate, guard, resolve, GuardDecision};
pub use navigator::Navigator;
pub use route::{Access, Route};
