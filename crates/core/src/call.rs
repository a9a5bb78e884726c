//! Bounded, cancellable external calls
//!
//! Every suspension point that talks to a collaborator (retrieval, provider
//! search, generation) goes through [`bounded`], so each call carries its own
//! timeout and observes the query's cancellation token.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Outcome of a bounded call
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    /// The call finished within its budget (it may still have failed)
    Completed(T),
    /// The per-call timeout elapsed first
    TimedOut,
    /// The token was cancelled before the call finished
    Cancelled,
}

impl<T> CallOutcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Completed value, if any
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Await `future` for at most `timeout`, aborting early if `cancel` fires.
///
/// Cancellation wins ties: a token that is already cancelled never polls the
/// future at all.
pub async fn bounded<F, T>(
    future: F,
    timeout: Duration,
    cancel: &CancellationToken,
) -> CallOutcome<T>
where
    F: Future<Output = T>,
{
    if cancel.is_cancelled() {
        return CallOutcome::Cancelled;
    }

    tokio::select! {
        biased;
        _ = cancel.cancelled() => CallOutcome::Cancelled,
        result = tokio::time::timeout(timeout, future) => match result {
            Ok(value) => CallOutcome::Completed(value),
            Err(_) => CallOutcome::TimedOut,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_within_budget() {
        let token = CancellationToken::new();
        let outcome = bounded(async { 42 }, Duration::from_millis(100), &token).await;
        assert_eq!(outcome, CallOutcome::Completed(42));
    }

    #[tokio::test]
    async fn test_times_out() {
        let token = CancellationToken::new();
        let outcome = bounded(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                1
            },
            Duration::from_millis(20),
            &token,
        )
        .await;
        assert_eq!(outcome, CallOutcome::TimedOut);
    }

    #[tokio::test]
    async fn test_cancel_aborts_promptly() {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            child.cancel();
        });

        let started = std::time::Instant::now();
        let outcome = bounded(
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                1
            },
            Duration::from_secs(10),
            &token,
        )
        .await;
        assert!(outcome.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_call() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = bounded(async { 7 }, Duration::from_secs(1), &token).await;
        assert_eq!(outcome, CallOutcome::Cancelled);
        assert_eq!(outcome.completed(), None);
    }
}
