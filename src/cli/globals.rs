use crate::cli::commands::DEFAULT_STORE_PATH;
use crate::config::{ClientConfig, ConfigOverrides};
use std::{path::PathBuf, time::Duration};

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_url: Option<String>,
    pub store_path: PathBuf,
    pub timeout: Option<Duration>,
    pub public_endpoints: Vec<String>,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            api_url: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            timeout: None,
            public_endpoints: Vec::new(),
        }
    }
}

impl GlobalArgs {
    #[must_use]
    pub fn from_matches(matches: &clap::ArgMatches) -> Self {
        let defaults = Self::default();
        Self {
            api_url: matches.get_one::<String>("api-url").cloned(),
            store_path: matches
                .get_one::<String>("store")
                .map_or(defaults.store_path, PathBuf::from),
            timeout: matches
                .get_one::<u64>("timeout")
                .map(|secs| Duration::from_secs(*secs)),
            public_endpoints: matches
                .get_many::<String>("public-endpoint")
                .map(|values| values.cloned().collect())
                .unwrap_or_default(),
        }
    }

    /// Layers the command-line values over the client defaults.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.apply_overrides(ConfigOverrides {
            api_base_url: self.api_url.clone(),
            refresh_path: None,
            public_endpoints: self.public_endpoints.clone(),
            credential_endpoints: Vec::new(),
            timeout: self.timeout,
        });
        config
    }
}
