//! Client configuration for the CMS admin REST backend.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names read by [`ClientConfig::from_env`].
pub const ENV_API_BASE_URL: &str = "CMS_API_BASE_URL";
pub const ENV_STORAGE_BASE_URL: &str = "CMS_STORAGE_BASE_URL";
pub const ENV_TOKEN_FILE: &str = "CMS_TOKEN_FILE";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CMS_REQUEST_TIMEOUT_SECS";

/// Top-level client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto.
    pub api_base_url: String,
    /// Base URL backend-relative file paths resolve against.
    pub storage_base_url: String,
    /// File the bearer token is persisted in.
    pub token_file: PathBuf,
    /// Blanket timeout applied to every request.
    pub request_timeout: Duration,
    /// Route returned in `Unauthorized` errors.
    pub login_route: String,
    /// Paths whose 401 responses do not evict the token.
    pub public_endpoints: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000/api".to_string(),
            storage_base_url: "http://localhost:8000/storage".to_string(),
            token_file: PathBuf::from(".cms-admin/token"),
            request_timeout: Duration::from_secs(30),
            login_route: "/login".to_string(),
            public_endpoints: vec![
                "/login".to_string(),
                "/register".to_string(),
                "/forgot-password".to_string(),
            ],
        }
    }
}

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be a whole number of seconds, got {value:?}")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

impl ClientConfig {
    /// Defaults overridden from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for malformed values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            config.api_base_url = non_empty(ENV_API_BASE_URL, url)?;
        }
        if let Some(url) = lookup(ENV_STORAGE_BASE_URL) {
            config.storage_base_url = url;
        }
        if let Some(path) = lookup(ENV_TOKEN_FILE) {
            config.token_file = PathBuf::from(non_empty(ENV_TOKEN_FILE, path)?);
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = parse_timeout(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
        }
        Ok(config)
    }

    /// Whether `path` is a public endpoint.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        let path = format!("/{}", path.trim_start_matches('/'));
        self.public_endpoints.iter().any(|public| {
            path == *public
                || path
                    .strip_prefix(public.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn non_empty(var: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Empty { var })
    } else {
        Ok(value)
    }
}

fn parse_timeout(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidTimeout {
            var,
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.public_endpoints, vec!["/login", "/register", "/forgot-password"]);
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_API_BASE_URL, "https://cms.test/api"),
            (ENV_TOKEN_FILE, "/tmp/token"),
            (ENV_REQUEST_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, "https://cms.test/api");
        assert_eq!(config.token_file, PathBuf::from("/tmp/token"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.storage_base_url, "http://localhost:8000/storage");
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err =
            ClientConfig::from_lookup(lookup(&[(ENV_REQUEST_TIMEOUT_SECS, "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
    }

    #[test]
    fn public_endpoint_matching() {
        let config = ClientConfig::default();
        assert!(config.is_public("/login"));
        assert!(config.is_public("login?next=/news"));
        assert!(config.is_public("/forgot-password/confirm"));
        assert!(!config.is_public("/login-history"));
        assert!(!config.is_public("/news"));
    }
}
