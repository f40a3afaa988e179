//! Retry with exponential back-off and jitter for primary KML fetches.
//!
//! Only transient failures are retried: timeouts, connect errors, and 5xx
//! responses. Everything else goes straight to the fallback source.

use std::future::Future;
use std::time::Duration;

use crate::error::LoaderError;
use crate::source::DocumentSource;

pub(crate) fn is_retriable(err: &LoaderError) -> bool {
    match err {
        LoaderError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        LoaderError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        LoaderError::Io { .. } | LoaderError::Parse { .. } | LoaderError::Build { .. } => false,
    }
}

/// Back-off schedule for primary fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Backoff {
    pub(crate) max_retries: u32,
    pub(crate) base_ms: u64,
}

impl Backoff {
    const MAX_DELAY_MS: u64 = 30_000;

    /// Un-jittered delay before retry number `retry` (1-based), capped at 30 s.
    fn nominal_ms(self, retry: u32) -> u64 {
        let doublings = retry.saturating_sub(1).min(10);
        self.base_ms
            .saturating_mul(1u64 << doublings)
            .min(Self::MAX_DELAY_MS)
    }

    /// Nominal delay scaled by a jitter factor in `[0.75, 1.25)`.
    fn delay(self, retry: u32) -> Duration {
        let jitter = 0.75 + rand::random::<f64>() * 0.5;
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let ms = (self.nominal_ms(retry) as f64 * jitter) as u64;
        Duration::from_millis(ms)
    }
}

/// Runs `operation` against `source`, retrying transient errors up to
/// `backoff.max_retries` more times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    backoff: Backoff,
    source: &DocumentSource,
    mut operation: F,
) -> Result<T, LoaderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LoaderError>>,
{
    let mut retry = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if retry >= backoff.max_retries || !is_retriable(&err) {
            return Err(err);
        }
        retry += 1;
        let delay = backoff.delay(retry);
        tracing::warn!(
            source = %source,
            retry,
            max_retries = backoff.max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "KML source failed transiently; retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
