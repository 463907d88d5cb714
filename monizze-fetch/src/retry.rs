//! Response classification and bounded exponential backoff

use reqwest::StatusCode;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    /// Token rejected; retrying cannot help.
    Unauthorized,
    /// Rate limited or server trouble; worth another attempt.
    Retry,
    /// Anything else the endpoint is not supposed to answer.
    Reject,
}

pub fn classify(status: StatusCode) -> Disposition {
    match status {
        s if s.is_success() => Disposition::Success,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Disposition::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => Disposition::Retry,
        s if s.is_server_error() => Disposition::Retry,
        _ => Disposition::Reject,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per page, the first one included
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `failed_attempt` (1-based).
    /// A server-provided `Retry-After` wins but is still capped.
    pub fn delay_after(&self, failed_attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(wait) = retry_after {
            return wait.min(self.max_delay);
        }
        let exp = failed_attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }
}
