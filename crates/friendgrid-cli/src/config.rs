//! Environment-based configuration.

use std::env;
use std::time::Duration;

use friendgrid_core::RuntimeConfig;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Runner configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// SendGrid API key. An empty key is sent as `Bearer `.
    pub api_key: String,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let http_timeout = env::var("FRIENDGRID_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        Self {
            api_key: env::var("FRIENDGRID_API_KEY").unwrap_or_default(),
            http_timeout: Duration::from_secs(http_timeout),
        }
    }

    pub fn runtime(&self) -> RuntimeConfig {
        RuntimeConfig::default().with_http_timeout(self.http_timeout)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_api_key() {
        let config = Config {
            api_key: "SG.secret".into(),
            http_timeout: Duration::from_secs(5),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SG.secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_runtime_uses_timeout() {
        let config = Config {
            api_key: String::new(),
            http_timeout: Duration::from_secs(7),
        };
        assert_eq!(config.runtime().http_timeout, Duration::from_secs(7));
    }
}
