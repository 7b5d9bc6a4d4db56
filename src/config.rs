//! Client configuration for the remote auth API with an optional override
//! layer. Overrides come from CLI flags or environment variables so the same
//! binary can target different deployments without rebuilding. Configuration
//! values are public; do not store secrets here.

use crate::error::{Error, Result};
use regex::escape;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refresh-token";
/// Default request timeout applied by the HTTP transport.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Endpoints that never carry an access token, even when one is held.
const PUBLIC_AUTH_ENDPOINTS: [&str; 2] = ["/auth/forgot-password", "/auth/reset-password"];

/// Endpoints that exchange credentials; their 401 never starts a refresh.
const CREDENTIAL_AUTH_ENDPOINTS: [&str; 4] = [
    "/auth/login",
    "/auth/signup",
    "/auth/verify-otp",
    "/auth/resend-otp",
];

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub refresh_path: String,
    /// Regular expressions matched anywhere in the request path.
    pub public_endpoints: Vec<String>,
    /// Same matching as `public_endpoints`.
    pub credential_endpoints: Vec<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            public_endpoints: PUBLIC_AUTH_ENDPOINTS.iter().map(|p| escape(p)).collect(),
            credential_endpoints: CREDENTIAL_AUTH_ENDPOINTS.iter().map(|p| escape(p)).collect(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: APP_USER_AGENT.to_string(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn new(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            ..Self::default()
        }
    }

    /// Applies every non-empty override on top of the current values.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(value) = overrides.api_base_url.as_deref().and_then(normalize_value) {
            self.api_base_url = value;
        }
        if let Some(value) = overrides.refresh_path.as_deref().and_then(normalize_value) {
            self.refresh_path = value;
        }
        let extra: Vec<String> = overrides
            .public_endpoints
            .iter()
            .filter_map(|value| normalize_value(value))
            .collect();
        if !extra.is_empty() {
            self.public_endpoints.extend(extra);
        }
        if let Some(timeout) = overrides.timeout.filter(|t| !t.is_zero()) {
            self.timeout = timeout;
        }
    }

    /// Returns the API base URL without a trailing slash.
    /// # Errors
    /// Returns `Error::Config` if the URL cannot be parsed or is not http(s).
    pub fn validated_base_url(&self) -> Result<String> {
        let raw = self.api_base_url.trim();
        let url = Url::parse(raw)
            .map_err(|err| Error::Config(format!("invalid API base URL {raw}: {err}")))?;

        match url.scheme() {
            "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
            scheme => Err(Error::Config(format!(
                "invalid API base URL {raw}: unsupported scheme {scheme}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub api_base_url: Option<String>,
    pub refresh_path: Option<String>,
    pub public_endpoints: Vec<String>,
    /// Same matching as `public_endpoints`.
    pub credential_endpoints: Vec<String>,
    pub timeout: Option<Duration>,
}

fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_value_trims_and_rejects_empty() {
        assert_eq!(normalize_value(""), None);
        assert_eq!(normalize_value("   "), None);
        assert_eq!(
            normalize_value("  https://auth.example.com/api "),
            Some("https://auth.example.com/api".to_string())
        );
    }

    #[test]
    fn apply_overrides_ignores_empty_values() {
        let mut config = ClientConfig::default();
        let overrides = ConfigOverrides {
            api_base_url: Some("  ".to_string()),
            refresh_path: Some(String::new()),
            public_endpoints: vec![" ".to_string()],
            credential_endpoints: Vec::new(),
            timeout: Some(Duration::ZERO),
        };

        config.apply_overrides(overrides);

        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
        assert_eq!(config.public_endpoints.len(), PUBLIC_AUTH_ENDPOINTS.len());
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn apply_overrides_overwrites_when_present() {
        let mut config = ClientConfig::default();
        let overrides = ConfigOverrides {
            api_base_url: Some("https://auth.example.com/api".to_string()),
            refresh_path: Some("/auth/token".to_string()),
            public_endpoints: vec!["^/status$".to_string()],
            credential_endpoints: Vec::new(),
            timeout: Some(Duration::from_secs(3)),
        };

        config.apply_overrides(overrides);

        assert_eq!(config.api_base_url, "https://auth.example.com/api");
        assert_eq!(config.refresh_path, "/auth/token");
        assert!(config.public_endpoints.contains(&"^/status$".to_string()));
        assert_eq!(config.public_endpoints.len(), PUBLIC_AUTH_ENDPOINTS.len() + 1);
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn default_credential_endpoints_are_escaped_literals() {
        let config = ClientConfig::default();
        assert_eq!(config.credential_endpoints.len(), CREDENTIAL_AUTH_ENDPOINTS.len());
        assert!(config.credential_endpoints.contains(&escape("/auth/verify-otp")));
        assert!(!config
            .credential_endpoints
            .iter()
            .any(|p| p.contains("refresh")));
    }

    #[test]
    fn validated_base_url_strips_trailing_slash() {
        let config = ClientConfig::new("https://auth.example.com/api/");
        assert_eq!(
            config.validated_base_url().ok(),
            Some("https://auth.example.com/api".to_string())
        );
    }

    #[test]
    fn validated_base_url_rejects_other_schemes() {
        assert!(ClientConfig::new("ftp://auth.example.com").validated_base_url().is_err());
        assert!(ClientConfig::new("not a url").validated_base_url().is_err());
    }
}
