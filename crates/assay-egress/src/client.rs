//! Shared HTTP client utilities

use crate::{EgressError, Result, parse_retry_after};
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 32,
            user_agent: format!("Assay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Upstreams drop idle connections after 60-120s
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| EgressError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport failure, reporting timeouts with the configured budget
pub(crate) fn map_send_error(err: reqwest::Error, timeout_secs: u64) -> EgressError {
    if err.is_timeout() {
        EgressError::Timeout(timeout_secs)
    } else {
        EgressError::HttpError(err)
    }
}

/// Log response status and headers at debug level
pub(crate) fn log_response_headers(label: &str, response: &Response) {
    debug!("┌─────────────────────────────────────────────────────────");
    debug!("│ {} Response Headers", label);
    debug!("├─────────────────────────────────────────────────────────");
    debug!("│ Status: {}", response.status());
    for (name, value) in response.headers() {
        if let Ok(val_str) = value.to_str() {
            debug!("│ {}: {}", name, val_str);
        }
    }
    debug!("└─────────────────────────────────────────────────────────");
}

/// Turn a non-2xx response into an error; 429 carries the parsed `Retry-After`
pub(crate) async fn error_from_response(response: Response) -> EgressError {
    let status_code = response.status().as_u16();

    if status_code == 429 {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        warn!(retry_after_secs = ?retry_after_secs, "Backend rate limit hit");
        return EgressError::RateLimitExceeded { retry_after_secs };
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error body".to_string());

    EgressError::ProviderError {
        status_code,
        message,
    }
}
