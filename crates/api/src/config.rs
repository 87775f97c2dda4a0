//! Client configuration.

use std::time::Duration;

/// Server used when `STOREFRONT_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";
/// Environment variable overriding the server base URL.
pub const API_URL_ENV: &str = "STOREFRONT_API_URL";
/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read the base URL from `STOREFRONT_API_URL`, falling back to the default.
    pub fn from_env() -> Self {
        let base_url = std::env::var(API_URL_ENV)
            .ok()
            .and_then(|v| normalize_base_url(&v))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_base_url(value: &str) -> Option<String> {
    Some(value.trim().trim_end_matches('/').to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_trimmed() {
        let config = ClientConfig::new(" https://shop.example.com/ ");
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn blank_base_url_falls_back_to_default() {
        assert_eq!(ClientConfig::new("  ").base_url, DEFAULT_API_URL);
    }

    #[test]
    fn env_override_is_read() {
        std::env::set_var(API_URL_ENV, "http://store.test/");
        assert_eq!(ClientConfig::from_env().base_url, "http://store.test");
        std::env::remove_var(API_URL_ENV);
        assert_eq!(ClientConfig::from_env().base_url, DEFAULT_API_URL);
    }
}
