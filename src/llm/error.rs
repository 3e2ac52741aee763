//! Error classification and retry policy for LLM requests.

use std::time::Duration;

use thiserror::Error;

/// Broad category of an LLM request failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LlmErrorKind {
    /// 429 from the provider.
    #[error("rate_limited")]
    RateLimited,
    /// 5xx from the provider.
    #[error("server_error")]
    ServerError,
    /// 4xx other than 429. Never retried.
    #[error("client_error")]
    ClientError,
    /// Timeout, refused connection, broken transport.
    #[error("network_error")]
    NetworkError,
    /// Response body could not be understood.
    #[error("parse_error")]
    ParseError,
}

/// Map an HTTP status code to an error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}

/// A classified LLM request failure.
#[derive(Debug, Clone, Error)]
#[error("{kind}{}: {message}", status_suffix(.status_code))]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub status_code: Option<u16>,
    /// Delay requested by the provider via `Retry-After`.
    pub retry_after: Option<Duration>,
}

fn status_suffix(status_code: &Option<u16>) -> String {
    status_code
        .map(|code| format!(" ({})", code))
        .unwrap_or_default()
}

impl LlmError {
    pub fn rate_limited(message: String, retry_after: Option<Duration>) -> Self {
        Self {
            kind: LlmErrorKind::RateLimited,
            message,
            status_code: Some(429),
            retry_after,
        }
    }

    pub fn server_error(status_code: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ServerError,
            message,
            status_code: Some(status_code),
            retry_after: None,
        }
    }

    pub fn client_error(status_code: u16, message: String) -> Self {
        Self {
            kind: LlmErrorKind::ClientError,
            message,
            status_code: Some(status_code),
            retry_after: None,
        }
    }

    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            message,
            status_code: None,
            retry_after: None,
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            message,
            status_code: None,
            retry_after: None,
        }
    }

    /// Delay before the next attempt: the provider's `Retry-After` if given,
    /// otherwise exponential backoff from one second, capped at 30 seconds.
    pub fn suggested_delay(&self, attempt: u32) -> Duration {
        if let Some(delay) = self.retry_after {
            return delay;
        }
        let base = Duration::from_secs(1);
        let factor = 2u32.saturating_pow(attempt.min(16));
        base.saturating_mul(factor).min(Duration::from_secs(30))
    }
}

/// Retry policy for transient LLM failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Upper bound on total time spent across all attempts.
    pub max_retry_duration: Duration,
    pub retry_rate_limits: bool,
    pub retry_server_errors: bool,
    pub retry_network_errors: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_retry_duration: Duration::from_secs(120),
            retry_rate_limits: true,
            retry_server_errors: true,
            retry_network_errors: true,
        }
    }
}

impl RetryConfig {
    /// Policy that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn should_retry(&self, error: &LlmError) -> bool {
        match error.kind {
            LlmErrorKind::RateLimited => self.retry_rate_limits,
            LlmErrorKind::ServerError => self.retry_server_errors,
            LlmErrorKind::NetworkError => self.retry_network_errors,
            LlmErrorKind::ClientError | LlmErrorKind::ParseError => false,
        }
    }
}
