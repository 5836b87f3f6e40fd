//! Deadline and cancellation for repository calls.

use crate::error::{DbError, DbResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation bound to a repository through `with_context`.
///
/// The default context never times out and cannot be cancelled.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
    budget: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self.budget = Some(timeout);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.budget = Some(deadline.saturating_duration_since(Instant::now()));
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Drive `fut`, giving up at the deadline or on cancellation.
    ///
    /// A future that is given up on is dropped, which releases its connection.
    pub async fn run<T, F>(&self, operation: &str, fut: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        if self.is_cancelled() {
            return Err(DbError::cancelled(operation));
        }

        let timed = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(DbError::timeout(operation, self.budget_ms())),
                },
                None => fut.await,
            }
        };

        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(DbError::cancelled(operation)),
                    result = timed => result,
                }
            }
            None => timed.await,
        }
    }

    fn budget_ms(&self) -> u64 {
        self.budget
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_context_passes_through() {
        let ctx = QueryContext::new();
        let value = ctx.run("noop", async { Ok(5) }).await.unwrap();
        assert_eq!(value, 5);
    }

    #[tokio::test]
    async fn test_timeout() {
        let ctx = QueryContext::new().with_timeout(Duration::from_millis(10));
        let err = ctx
            .run("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        match err {
            DbError::Timeout {
                operation,
                timeout_ms,
            } => {
                assert_eq!(operation, "slow");
                assert_eq!(timeout_ms, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = QueryContext::new().with_cancellation(token);
        let err = ctx.run("find", async { Ok(()) }).await.unwrap_err();
        assert!(matches!(err, DbError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_while_running() {
        let token = CancellationToken::new();
        let ctx = QueryContext::new().with_cancellation(token.clone());
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            token.cancel();
        };
        let (result, _) = tokio::join!(
            ctx.run("find", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            }),
            canceller
        );
        assert!(matches!(result, Err(DbError::Cancelled { .. })));
    }
}
