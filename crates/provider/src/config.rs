//! Provider connection configuration.

use std::time::Duration;

/// Transport timeout applied to every Provider call. Past this the call is
/// reported as unavailable, distinct from an explicit Provider error.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9090".to_string(),
            api_key: "dev-key".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ProviderConfig {
    /// Read configuration from the environment, falling back to dev defaults.
    ///
    /// `PROVIDER_BASE_URL`, `PROVIDER_API_KEY`, `PROVIDER_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("PROVIDER_BASE_URL").unwrap_or_else(|_| {
            tracing::warn!("PROVIDER_BASE_URL not set; using dev default");
            defaults.base_url.clone()
        });

        let api_key = std::env::var("PROVIDER_API_KEY").unwrap_or_else(|_| {
            tracing::warn!("PROVIDER_API_KEY not set; using insecure dev default");
            defaults.api_key.clone()
        });

        let timeout = std::env::var("PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            base_url,
            api_key,
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
