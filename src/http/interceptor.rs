//! Attaches the in-memory access token to outgoing requests.
//!
//! Public endpoints (password recovery) must never carry a token, even when
//! one is held. Decoration is a pure transformation plus one session read.
//!
//! Credential exchanges (login, signup, OTP) are decorated as usual, but a 401
//! from them means rejected credentials, not an expired access token.

use crate::error::{Error, Result};
use crate::http::request::ApiRequest;
use crate::session::SessionStore;
use regex::RegexSet;

#[derive(Clone, Debug)]
pub struct RequestInterceptor {
    public_endpoints: RegexSet,
    credential_endpoints: RegexSet,
}

impl RequestInterceptor {
    /// Compiles the public-endpoint patterns; each is matched anywhere in the path.
    /// # Errors
    /// Returns `Error::Config` if a pattern is not a valid regular expression.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        Ok(Self {
            public_endpoints: compile(patterns, "public")?,
            credential_endpoints: RegexSet::empty(),
        })
    }

    /// Marks endpoints whose 401 must not start a token refresh.
    /// # Errors
    /// Returns `Error::Config` if a pattern is not a valid regular expression.
    pub fn with_credential_endpoints<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self> {
        self.credential_endpoints = compile(patterns, "credential")?;
        Ok(self)
    }

    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.public_endpoints.is_match(path)
    }

    #[must_use]
    pub fn is_credential_exchange(&self, path: &str) -> bool {
        self.credential_endpoints.is_match(path)
    }

    #[must_use]
    pub fn decorate(&self, request: ApiRequest, session: &SessionStore) -> ApiRequest {
        if self.is_public(&request.path) {
            return request.with_bearer(None);
        }
        request.with_bearer(session.current_access_token())
    }
}

fn compile<S: AsRef<str>>(patterns: &[S], kind: &str) -> Result<RegexSet> {
    let patterns: Vec<&str> = patterns.iter().map(|p| p.as_ref()).collect();
    RegexSet::new(patterns)
        .map_err(|err| Error::Config(format!("invalid {kind} endpoint pattern: {err}")))
}
