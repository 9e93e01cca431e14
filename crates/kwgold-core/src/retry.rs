use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Delay schedule between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    Fixed { delay_ms: u64 },
    Exponential { base_ms: u64 },
}

/// One retry policy shared by every oracle adapter. The original service
/// calls each carried their own ad-hoc retry loops; the adapters now all
/// go through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Backoff::Fixed { delay_ms: 100 },
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed { delay_ms },
        }
    }

    pub fn exponential(max_attempts: u32, base_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential { base_ms },
        }
    }

    /// Delay to sleep before the given 0-based attempt; the first attempt
    /// runs immediately.
    pub fn delay_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            return None;
        }
        let ms = match self.backoff {
            Backoff::Fixed { delay_ms } => delay_ms,
            Backoff::Exponential { base_ms } => base_ms.saturating_mul(1 << (attempt - 1).min(16)),
        };
        Some(Duration::from_millis(ms))
    }

    /// Run `op` until it succeeds or attempts are exhausted, returning the
    /// last error. Transient and permanent failures are not distinguished
    /// here; callers that care do their own bookkeeping.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: fmt::Display,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            if let Some(delay) = self.delay_before(attempt) {
                tokio::time::sleep(delay).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(e);
                    }
                    warn!("{label} failed (attempt {attempt}/{attempts}): {e}");
                }
            }
        }
    }
}
