//! Runtime configuration for node execution.

use std::time::Duration;

/// Runtime configuration shared by every node execution.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Timeout applied to each outgoing HTTP request.
    pub http_timeout: Duration,
    /// `User-Agent` sent with outgoing requests.
    pub user_agent: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            user_agent: format!("friendgrid/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RuntimeConfig {
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}
