//! Deadline for a single network attempt.

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Resolves to the attempt's own outcome, or `Error::Timeout` once `deadline`
/// elapses. The losing side is dropped, which also drops the timer.
pub async fn with_timeout<T, F>(attempt: F, deadline: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, attempt).await {
        Ok(outcome) => outcome,
        Err(_) => Err(Error::Timeout {
            ms: deadline.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn passes_through_fast_success() {
        let out = with_timeout(async { Ok::<_, Error>(7) }, Duration::from_millis(500)).await;
        assert_eq!(out.unwrap(), 7);
    }

    #[tokio::test]
    async fn passes_through_fast_failure() {
        let out: Result<()> = with_timeout(
            async { Err(Error::Auth("nope".into())) },
            Duration::from_millis(500),
        )
        .await;
        assert!(matches!(out, Err(Error::Auth(_))));
    }

    #[tokio::test]
    async fn pending_attempt_times_out_on_schedule() {
        let started = Instant::now();
        let out: Result<()> =
            with_timeout(std::future::pending::<Result<()>>(), Duration::from_millis(50)).await;
        let elapsed = started.elapsed();
        match out {
            Err(Error::Timeout { ms }) => assert_eq!(ms, 50),
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_secs(2));
    }
}
