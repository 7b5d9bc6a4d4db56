use crate::error::{Error, Result};
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

/// Outgoing request descriptor. Everything needed to replay the call is kept
/// here so a request can be re-sent after a token refresh with only the bearer
/// substituted.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, including any query string.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    bearer: Option<SecretString>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            bearer: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Sets a JSON body and the matching content type.
    /// # Errors
    /// Returns `Error::Serialization` if the body cannot be encoded.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let payload = serde_json::to_string(body)
            .map_err(|err| Error::Serialization(format!("Failed to encode request: {err}")))?;
        self.headers
            .retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        self.headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        self.body = Some(payload);
        Ok(self)
    }

    /// Token that will be sent as `Authorization: Bearer`, if any.
    #[must_use]
    pub fn bearer(&self) -> Option<&SecretString> {
        self.bearer.as_ref()
    }

    #[must_use]
    pub fn with_bearer(mut self, token: Option<SecretString>) -> Self {
        self.bearer = token;
        self
    }

    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    /// Marks the request as a replay so a second auth failure is not recovered.
    #[must_use]
    pub fn into_retry(mut self) -> Self {
        self.retried = true;
        self
    }

    /// True when `token` is the bearer this request was sent with.
    #[must_use]
    pub fn carries(&self, token: Option<&SecretString>) -> bool {
        match (self.bearer.as_ref(), token) {
            (Some(sent), Some(token)) => sent.expose_secret() == token.expose_secret(),
            (None, None) => true,
            _ => false,
        }
    }
}
