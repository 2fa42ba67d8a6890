//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeouts and compression
//! - Rotating the client identity header on every attempt
//! - Retry logic with growing backoff for transient failures
//! - Error classification (not found vs. other terminal failures)

use crate::config::{BackoffPolicy, FetchConfig};
use rand::seq::IndexedRandom;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use std::time::Duration;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchOutcome {
    /// Successfully fetched the page
    Success {
        /// Page body content
        body: String,
        /// HTTP status code
        status_code: u16,
        /// Attempts used, including the successful one
        attempts: u32,
    },

    /// The server answered 404; never retried
    NotFound {
        /// Attempts used
        attempts: u32,
    },

    /// Non-retryable error, or retries exhausted
    Failed {
        /// Error description
        error: String,
        /// Last HTTP status received, if any
        status_code: Option<u16>,
        /// Attempts used
        attempts: u32,
    },
}

/// How often and how patiently a URL is retried
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Base delay fed to the backoff policy
    pub base_delay: Duration,
    /// Growth of the delay between attempts
    pub backoff: BackoffPolicy,
}

impl RetryPolicy {
    /// Builds the policy described by the fetch configuration
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            base_delay: Duration::from_millis(config.backoff_base_ms),
            backoff: config.backoff_policy,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    ///
    /// | Policy | Delay |
    /// |--------|-------|
    /// | Exponential | `base * 2^(attempt - 1)` |
    /// | Linear | `base * attempt` |
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let factor = match self.backoff {
            BackoffPolicy::Exponential => 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX),
            BackoffPolicy::Linear => attempt,
        };
        self.base_delay.saturating_mul(factor)
    }
}

/// Classification of a single failed attempt
#[derive(Debug)]
enum AttemptError {
    /// Worth another attempt (connection, timeout, 5xx, 429, truncated body)
    Transient {
        error: String,
        status_code: Option<u16>,
    },
    /// Retrying cannot help
    Terminal {
        error: String,
        status_code: Option<u16>,
    },
}

/// Builds an HTTP client with proper configuration
///
/// The client carries no fixed user agent; [`Fetcher`] sets one per attempt.
///
/// # Example
///
/// ```no_run
/// use judgment_harvest::config::FetchConfig;
/// use judgment_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP GET with retry, backoff and identity rotation
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    policy: RetryPolicy,
    user_agents: Vec<String>,
}

impl Fetcher {
    /// Creates a fetcher from the fetch configuration
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(
            build_http_client(config)?,
            RetryPolicy::from_config(config),
            config.user_agents.clone(),
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy, user_agents: Vec<String>) -> Self {
        Self {
            client,
            policy,
            user_agents,
        }
    }

    /// Fetches a URL with full error handling and retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | HTTP 2xx | Success |
    /// | HTTP 404 | Immediate → NotFound |
    /// | HTTP 429 | Retry with backoff |
    /// | HTTP 5xx | Retry with backoff |
    /// | Timeout / connection error | Retry with backoff |
    /// | Body read error | Retry with backoff |
    /// | Other status or client error | Immediate → Failed |
    ///
    /// Exhausting `max_attempts` turns the last transient error into `Failed`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            tracing::debug!("Attempt {}/{}: fetching {}", attempt, max_attempts, url);

            let error = match self.attempt(url).await {
                Ok(Some((body, status_code))) => {
                    return FetchOutcome::Success {
                        body,
                        status_code,
                        attempts: attempt,
                    };
                }
                Ok(None) => {
                    tracing::info!("Page not found (404): {}", url);
                    return FetchOutcome::NotFound { attempts: attempt };
                }
                Err(error) => error,
            };

            match error {
                AttemptError::Terminal { error, status_code } => {
                    tracing::error!("Non-retryable error fetching {}: {}", url, error);
                    return FetchOutcome::Failed {
                        error,
                        status_code,
                        attempts: attempt,
                    };
                }
                AttemptError::Transient { error, status_code } => {
                    if attempt >= max_attempts {
                        tracing::error!(
                            "Failed to fetch {} after {} attempts: {}",
                            url,
                            attempt,
                            error
                        );
                        return FetchOutcome::Failed {
                            error,
                            status_code,
                            attempts: attempt,
                        };
                    }

                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                        attempt,
                        max_attempts,
                        url,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Performs a single GET
    ///
    /// Returns `Ok(Some(..))` on success and `Ok(None)` on 404.
    async fn attempt(&self, url: &str) -> Result<Option<(String, u16)>, AttemptError> {
        let user_agent = self.pick_user_agent().to_string();

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(AttemptError::Transient {
                error: format!("HTTP {}", status.as_u16()),
                status_code: Some(status.as_u16()),
            });
        }

        if !status.is_success() {
            return Err(AttemptError::Terminal {
                error: format!("HTTP {}", status.as_u16()),
                status_code: Some(status.as_u16()),
            });
        }

        match response.text().await {
            Ok(body) => Ok(Some((body, status.as_u16()))),
            Err(e) => Err(AttemptError::Transient {
                error: format!("Failed to read body: {}", e),
                status_code: Some(status.as_u16()),
            }),
        }
    }

    /// Picks a client identity for one attempt
    fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::rng())
            .map(String::as_str)
            .unwrap_or(concat!("judgment-harvest/", env!("CARGO_PKG_VERSION")))
    }
}

/// Classifies a transport-level reqwest error
fn classify_request_error(e: reqwest::Error) -> AttemptError {
    if e.is_timeout() {
        AttemptError::Transient {
            error: "Request timeout".to_string(),
            status_code: None,
        }
    } else if e.is_connect() {
        AttemptError::Transient {
            error: format!("Connection error: {}", e),
            status_code: None,
        }
    } else if e.is_request() || e.is_body() {
        AttemptError::Transient {
            error: e.to_string(),
            status_code: None,
        }
    } else {
        AttemptError::Terminal {
            error: e.to_string(),
            status_code: e.status().map(|s| s.as_u16()),
        }
    }
}
