// Request pacing and retry for Perseus fetches.
//
// The library is an academic service with no published rate limit, but it
// falls over readily: long vocabulary queries time out, and the hopper
// intermittently answers 5xx under load. This module provides a minimum-delay
// pacer so downloads stay polite, plus a retry wrapper that backs off
// exponentially on transient failures and gives up on everything else.
//
// The pacer is shared across tasks via Arc<Pacer>, using interior mutability
// (Mutex) so callers only need a &self reference.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::warn;

/// Enforces a minimum delay between consecutive requests.
pub struct Pacer {
    min_delay: Duration,
    /// Timestamp of the last request.
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    /// Create a pacer with `min_delay_ms` milliseconds between requests.
    pub fn new(min_delay_ms: u64) -> Self {
        Self {
            min_delay: Duration::from_millis(min_delay_ms),
            last_request: Mutex::new(None),
        }
    }

    /// Wait until the minimum delay since the previous request has passed.
    ///
    /// The wait is computed while holding the lock, then the lock is dropped
    /// before sleeping so a MutexGuard never lives across an await point.
    pub async fn acquire(&self) {
        let wait = {
            let last = self.last_request.lock().unwrap();
            last.and_then(|last_time| {
                let elapsed = last_time.elapsed();
                (elapsed < self.min_delay).then(|| self.min_delay - elapsed)
            })
        };

        if let Some(wait) = wait {
            tokio::time::sleep(wait).await;
        }

        let mut last = self.last_request.lock().unwrap();
        *last = Some(Instant::now());
    }
}

/// Maximum number of retry attempts on transient errors.
const MAX_RETRIES: u32 = 5;

/// Base delay for exponential backoff (doubles each retry).
const BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Maximum backoff delay to cap exponential growth.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Check whether an error looks transient enough to retry.
///
/// reqwest wraps IO failures several layers deep, so we check the error
/// chain's Debug representation for timeout wording, dropped connections,
/// and the status codes the hopper emits when overloaded.
fn is_transient_error(err: &anyhow::Error) -> bool {
    let debug_str = format!("{:?}", err);
    let lower = debug_str.to_lowercase();
    lower.contains("timed out")
        || lower.contains("timeout")
        || lower.contains("connection reset")
        || lower.contains("connection closed")
        || lower.contains("temporarily unavailable")
        || ["429", "500", "502", "503", "504"]
            .iter()
            .any(|code| debug_str.contains(code))
}

/// Retry an async operation with exponential backoff on transient errors.
///
/// The operation is attempted up to `MAX_RETRIES` + 1 times with
/// exponentially increasing delays (plus jitter to spread reruns out).
/// Permanent errors are returned immediately. The pacer's `acquire()` runs
/// before each attempt so retries stay paced too.
pub async fn with_retry<F, Fut, T>(pacer: &Pacer, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0u32;

    loop {
        pacer.acquire().await;

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_transient_error(&err) || attempt >= MAX_RETRIES {
                    return Err(err);
                }

                attempt += 1;

                // Exponential backoff: base * 2^attempt, capped at MAX_BACKOFF
                let backoff = BASE_BACKOFF
                    .saturating_mul(1u32 << attempt)
                    .min(MAX_BACKOFF);

                // Jitter of 0.75x to 1.25x, derived from the clock's
                // nanosecond component rather than pulling in `rand`.
                let nanos = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .subsec_nanos();
                let jitter_factor = 0.75 + (nanos % 500) as f64 / 1000.0;
                let jittered = Duration::from_secs_f64(backoff.as_secs_f64() * jitter_factor);

                warn!(
                    attempt = attempt,
                    max_retries = MAX_RETRIES,
                    backoff_secs = jittered.as_secs_f64(),
                    "Transient fetch error, retrying in {:.1}s (attempt {}/{}): {}",
                    jittered.as_secs_f64(),
                    attempt,
                    MAX_RETRIES,
                    err,
                );

                tokio::time::sleep(jittered).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // ── Pacer ───────────────────────────────────────────────────────

    #[test]
    fn test_new_creates_idle_pacer() {
        let pacer = Pacer::new(500);
        assert_eq!(pacer.min_delay, Duration::from_millis(500));
        assert!(pacer.last_request.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_acquire_is_immediate() {
        let pacer = Pacer::new(200);

        let start = Instant::now();
        pacer.acquire().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(50),
            "First request should be near-instant, got {:?}",
            elapsed
        );
        assert!(pacer.last_request.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_acquire_enforces_min_delay() {
        let pacer = Pacer::new(50);

        let start = Instant::now();
        pacer.acquire().await;
        pacer.acquire().await;
        let elapsed = start.elapsed();

        assert!(
            elapsed >= Duration::from_millis(45),
            "Expected at least ~50ms delay, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_zero_delay_allows_rapid_fire() {
        let pacer = Pacer::new(0);

        let start = Instant::now();
        for _ in 0..50 {
            pacer.acquire().await;
        }
        let elapsed = start.elapsed();

        assert!(
            elapsed < Duration::from_millis(50),
            "Zero-delay requests should be near-instant, got {:?}",
            elapsed
        );
    }

    // ── is_transient_error ──────────────────────────────────────────

    #[test]
    fn test_timeouts_are_transient() {
        assert!(is_transient_error(&anyhow::anyhow!(
            "operation timed out after 30s"
        )));
        assert!(is_transient_error(&anyhow::anyhow!("request Timeout")));
    }

    #[test]
    fn test_server_errors_are_transient() {
        assert!(is_transient_error(&anyhow::anyhow!(
            "GET http://x returned 503 Service Unavailable"
        )));
        assert!(is_transient_error(&anyhow::anyhow!("returned 500")));
        assert!(is_transient_error(&anyhow::anyhow!("HTTP 429")));
    }

    #[test]
    fn test_dropped_connections_are_transient() {
        assert!(is_transient_error(&anyhow::anyhow!(
            "Connection reset by peer"
        )));
        assert!(is_transient_error(&anyhow::anyhow!("connection closed")));
    }

    #[test]
    fn test_permanent_errors_are_not_transient() {
        assert!(!is_transient_error(&anyhow::anyhow!("returned 404 Not Found")));
        assert!(!is_transient_error(&anyhow::anyhow!("returned 403 Forbidden")));
        assert!(!is_transient_error(&anyhow::anyhow!(
            "column \"weightedFrequency\" not found"
        )));
        assert!(!is_transient_error(&anyhow::anyhow!("")));
    }

    #[test]
    fn test_transient_detected_through_context_chain() {
        let inner = anyhow::anyhow!("connection reset by peer");
        let outer = inner.context("Failed to fetch vocabulary list");
        assert!(is_transient_error(&outer));
    }

    // ── with_retry ──────────────────────────────────────────────────
    // start_paused skips the backoff sleeps; these tests check call
    // counts and return values, not elapsed time.

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_immediately() {
        let pacer = Pacer::new(0);
        let call_count = AtomicU32::new(0);

        let result = with_retry(&pacer, || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, anyhow::Error>(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_retries_transient_then_succeeds() {
        let pacer = Pacer::new(0);
        let call_count = AtomicU32::new(0);

        let result = with_retry(&pacer, || {
            let attempt = call_count.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(anyhow::anyhow!("returned 503 Service Unavailable"))
                } else {
                    Ok(99)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3); // 2 failures + 1 success
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_passes_through_permanent_errors() {
        let pacer = Pacer::new(0);
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&pacer, || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("returned 404 Not Found")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_exhausts_retries() {
        let pacer = Pacer::new(0);
        let call_count = AtomicU32::new(0);

        let result: Result<i32> = with_retry(&pacer, || {
            call_count.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("operation timed out")) }
        })
        .await;

        assert!(result.is_err());
        // 1 initial + MAX_RETRIES (5) = 6 total calls
        assert_eq!(call_count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_succeeds_on_last_attempt() {
        let pacer = Pacer::new(0);
        let call_count = AtomicU32::new(0);

        let result = with_retry(&pacer, || {
            let attempt = call_count.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 5 {
                    Err(anyhow::anyhow!("returned 502 Bad Gateway"))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(call_count.load(Ordering::SeqCst), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_retry_preserves_original_error_message() {
        let pacer = Pacer::new(0);

        let result: Result<i32> = with_retry(&pacer, || async {
            Err(anyhow::anyhow!("returned 503: the hopper is resting"))
        })
        .await;

        let err = result.unwrap_err();
        assert!(
            err.to_string().contains("the hopper is resting"),
            "Original error message should be preserved, got: {}",
            err
        );
    }
}
