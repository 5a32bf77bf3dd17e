//! REST client configuration

use crate::core::config::HarnessConfig;

/// Configuration for the REST client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// REST base URL, e.g. `http://localhost:8111/app/rest`
    pub base_url: String,

    /// Bearer token sent with every request
    pub token: Option<String>,

    /// Timeout for a single request in seconds
    pub timeout_secs: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8111/app/rest".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take connection settings from the harness config
    pub fn from_harness(config: &HarnessConfig) -> Self {
        Self {
            base_url: config.base_url(),
            token: Some(config.token.clone()),
            timeout_secs: config.request_timeout_secs,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_client_config_builder() {
        let config = ApiClientConfig::new()
            .with_base_url("http://ci.local:8111/app/rest")
            .with_token("secret")
            .with_timeout(5);

        assert_eq!(config.base_url, "http://ci.local:8111/app/rest");
        assert_eq!(config.token.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_from_harness_config() {
        let harness = HarnessConfig::from_yaml(
            "server: \"http://ci:8111\"\ntoken: tok\nrequest_timeout_secs: 12\n",
        )
        .unwrap();
        let config = ApiClientConfig::from_harness(&harness);
        assert_eq!(config.base_url, "http://ci:8111/app/rest");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_secs, 12);
    }
}
