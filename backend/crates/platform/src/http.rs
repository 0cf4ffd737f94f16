//! Outbound HTTP client construction
//!
//! One `reqwest::Client` is built at startup and shared by every caller.
//! Retries and pool tuning are left to reqwest defaults.

use std::time::Duration;

/// Settings for the outbound HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout (connect + response)
    pub timeout: Duration,
    /// Optional proxy URL applied to all schemes
    pub proxy: Option<String>,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            proxy: None,
            user_agent: concat!("bridge/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Default::default()
        }
    }
}

/// Error when building the HTTP client
#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("Invalid proxy URL '{url}': {source}")]
    InvalidProxy {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

/// Build a shared HTTP client from config
pub fn build_client(config: &HttpClientConfig) -> Result<reqwest::Client, HttpClientError> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .user_agent(config.user_agent.clone());

    if let Some(url) = config.proxy.as_deref().filter(|u| !u.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(url).map_err(|source| HttpClientError::InvalidProxy {
            url: url.to_string(),
            source,
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(HttpClientError::Build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.proxy.is_none());
        assert!(config.user_agent.starts_with("bridge/"));
    }

    #[test]
    fn test_build_without_proxy() {
        let config = HttpClientConfig::with_timeout(Duration::from_secs(5));
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_blank_proxy_is_ignored() {
        let config = HttpClientConfig {
            proxy: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }

    #[test]
    fn test_build_with_proxy() {
        let config = HttpClientConfig {
            proxy: Some("http://proxy.local:3128".to_string()),
            ..Default::default()
        };
        assert!(build_client(&config).is_ok());
    }
}
