//! # authkeeper
//!
//! Client-side session handling for a token-based auth API.
//!
//! The access token lives in memory only. The refresh token and the last known
//! user record are persisted through a [`session::storage::DurableStorage`]
//! backend. Every call made through [`http::ApiClient`] is decorated with the
//! current bearer token, and an expired token is recovered transparently:
//!
//! 1. The first request rejected with `401` opens a refresh cycle and performs
//!    the one and only refresh exchange.
//! 2. Requests rejected while that cycle is open park on it instead of
//!    refreshing again.
//! 3. When the cycle settles, every parked request is replayed once with the
//!    new token, or fails together with it.
//!
//! A failed refresh ends the session: durable keys are removed and a single
//! [`navigation::Redirect::Login`] is emitted for the application to act on.
//!
//! [`auth::AuthFacade`] wraps the auth endpoints and [`auth::AccessGuard`]
//! decides whether a route should be shown for the current session.

pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod navigation;
pub mod session;

pub use error::{Error, Result};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
