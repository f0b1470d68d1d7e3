use std::future::Future;

use tracing::warn;

use crate::errors::FulfillmentError;

/// Attempt budget for a whole unit of work. Two attempts means one replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(2)
    }
}

/// Runs `attempt_fn` until it succeeds, fails with a non-retryable error, or
/// the policy's attempt budget is spent. Each call must start from scratch.
pub async fn run_with_conflict_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation: &'static str,
    mut attempt_fn: F,
) -> Result<T, FulfillmentError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, FulfillmentError>>,
{
    let mut attempt = 1;
    loop {
        match attempt_fn(attempt).await {
            Err(error) if error.is_retryable() && attempt < policy.max_attempts => {
                warn!(
                    event_name = "fulfillment.retry.scheduled",
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %error,
                    "transient conflict; replaying whole operation"
                );
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::{run_with_conflict_retry, RetryPolicy};
    use crate::domain::variant::VariantId;
    use crate::errors::FulfillmentError;

    fn conflict() -> FulfillmentError {
        FulfillmentError::TransientConflict { detail: "database is locked".to_string() }
    }

    #[tokio::test]
    async fn conflict_is_replayed_exactly_once_then_surfaced() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = run_with_conflict_retry(RetryPolicy::default(), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(conflict()) }
        })
        .await;

        assert_eq!(result, Err(conflict()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn second_attempt_success_is_returned() {
        let result = run_with_conflict_retry(RetryPolicy::default(), "test", |attempt| async move {
            if attempt == 1 {
                Err(conflict())
            } else {
                Ok(attempt)
            }
        })
        .await;

        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn business_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let shortage = FulfillmentError::InsufficientStock {
            variant: VariantId(1),
            requested: 5,
            shortfall: 1,
        };
        let result: Result<(), _> = run_with_conflict_retry(RetryPolicy::new(5), "test", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            let shortage = shortage.clone();
            async move { Err(shortage) }
        })
        .await;

        assert!(matches!(result, Err(FulfillmentError::InsufficientStock { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_attempt_budget_still_runs_once() {
        assert_eq!(RetryPolicy::new(0).max_attempts(), 1);
    }
}
