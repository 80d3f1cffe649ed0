//! Configuration types for the remote background removal client

use crate::error::{BgRemovalError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default remove.bg endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";

/// Default value of the `size` multipart field
pub const DEFAULT_SIZE: &str = "auto";

/// Configuration for the background service client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Endpoint receiving the multipart POST
    pub endpoint: String,

    /// Value sent in the `size` field ("auto", "preview", "full", ...)
    pub size: String,

    /// Whole-request timeout; `None` leaves the round trip unbounded
    pub timeout: Option<Duration>,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            size: DEFAULT_SIZE.to_string(),
            timeout: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    ///
    /// ```rust
    /// use remote_bgremove::ClientConfig;
    /// use std::time::Duration;
    ///
    /// let config = ClientConfig::builder()
    ///     .endpoint("http://127.0.0.1:8080/v1.0/removebg")
    ///     .timeout(Duration::from_secs(30))
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.size, "auto");
    /// ```
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validate all configuration parameters
    ///
    /// # Errors
    /// - Endpoint is not an `http://` or `https://` URL
    /// - Empty `size` value
    /// - Zero timeout
    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(BgRemovalError::config_value_error(
                "endpoint",
                &self.endpoint,
                "http:// or https:// URL",
            ));
        }

        if self.size.trim().is_empty() {
            return Err(BgRemovalError::invalid_config("size must not be empty"));
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(BgRemovalError::config_value_error("timeout", "0s", "> 0s"));
        }

        Ok(())
    }
}

/// Builder for `ClientConfig`
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the service endpoint
    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    /// Set the `size` field value
    #[must_use]
    pub fn size<S: Into<String>>(mut self, size: S) -> Self {
        self.config.size = size.into();
        self
    }

    /// Bound the request duration
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    #[must_use]
    pub fn user_agent<S: Into<String>>(mut self, user_agent: S) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating it first
    ///
    /// # Errors
    /// See [`ClientConfig::validate`]
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.size, "auto");
        assert!(config.timeout.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .endpoint("http://localhost:9000/removebg")
            .size("preview")
            .timeout(Duration::from_secs(5))
            .user_agent("tests")
            .build()
            .unwrap();

        assert_eq!(config.endpoint, "http://localhost:9000/removebg");
        assert_eq!(config.size, "preview");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.user_agent, "tests");
    }

    #[test]
    fn test_validation_failures() {
        let err = ClientConfig::builder().endpoint("ftp://example.com").build().unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        assert!(ClientConfig::builder().size("  ").build().is_err());
        assert!(ClientConfig::builder().timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn test_serde_roundtrip_keeps_timeout() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_millis(1500))
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: ClientConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
