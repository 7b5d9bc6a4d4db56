//! Auth API operations and route gating.

pub mod facade;
pub mod guard;
pub mod types;

pub use facade::AuthFacade;
pub use guard::{decide, Access, AccessGuard, Requirement, RouteRule};
