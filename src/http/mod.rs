//! HTTP layer for the auth API: request descriptors, token decoration,
//! single-flight refresh coordination, and the client tying them together.

pub mod client;
pub mod interceptor;
pub mod refresh;
pub mod request;

pub use client::{ApiClient, ApiResponse};
pub use interceptor::RequestInterceptor;
pub use refresh::{RefreshCoordinator, RefreshPhase};
pub use request::ApiRequest;
