// src/services/retry.rs

use rand::Rng;
use std::{future::Future, time::Duration};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Report jobs: 60 s, 120 s, 240 s ... capped at 15 minutes.
    pub const REPORTS: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base: Duration::from_secs(60),
        max_delay: Duration::from_secs(900),
    };

    /// Outgoing mail: 2 s, 4 s, capped at 30 s.
    pub const EMAIL: RetryPolicy = RetryPolicy {
        max_attempts: 3,
        base: Duration::from_secs(2),
        max_delay: Duration::from_secs(30),
    };

    /// Delay before the retry that follows failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// `backoff` plus up to 10% random jitter so retries do not line up.
    pub fn backoff_with_jitter(&self, attempt: u32) -> Duration {
        let delay = self.backoff(attempt);
        let spread = (delay.as_millis() as u64 / 10).max(1);
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..spread))
    }
}

/// Run `op` until it succeeds or the policy's attempt cap is reached,
/// sleeping the jittered backoff between attempts.
pub async fn retry<T, E, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= policy.max_attempts => return Err(err),
            Err(err) => {
                let delay = policy.backoff_with_jitter(attempt);
                warn!(
                    task = what,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn backoff_doubles_until_the_cap() {
        let policy = RetryPolicy::REPORTS;
        assert_eq!(policy.backoff(1), Duration::from_secs(60));
        assert_eq!(policy.backoff(2), Duration::from_secs(120));
        assert_eq!(policy.backoff(3), Duration::from_secs(240));
        assert_eq!(policy.backoff(10), Duration::from_secs(900));
        assert_eq!(policy.backoff(0), Duration::from_secs(60));
    }

    #[test]
    fn jitter_stays_within_ten_percent() {
        let policy = RetryPolicy::EMAIL;
        for attempt in 1..5 {
            let base = policy.backoff(attempt);
            let jittered = policy.backoff_with_jitter(attempt);
            assert!(jittered >= base);
            assert!(jittered <= base + base / 10);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = retry(RetryPolicy::EMAIL, "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { if n < 3 { Err(format!("fail {n}")) } else { Ok(n) } }
        })
        .await;
        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry(RetryPolicy::EMAIL, "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("down".to_string()) }
        })
        .await;
        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
