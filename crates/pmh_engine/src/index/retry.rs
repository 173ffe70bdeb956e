use std::future::Future;
use std::time::Duration;

use pmh_core::Query;
use pmh_logging::{pmh_error, pmh_warn};

use super::{FieldValue, IndexQuery, IndexService, QueryResult};
use crate::IndexError;

/// Retries timed-out index calls up to a fixed number of attempts. Any other
/// failure is returned immediately.
#[derive(Debug, Clone)]
pub struct RetryingIndex<I> {
    inner: I,
    max_attempts: u32,
    backoff: Duration,
}

impl<I: IndexService> RetryingIndex<I> {
    pub fn new(inner: I, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            backoff: Duration::from_millis(200),
        }
    }

    /// Base delay between attempts; grows linearly with the attempt number.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, IndexError>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, IndexError>> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            match call().await {
                Err(err) if err.is_timeout() && attempt < self.max_attempts => {
                    pmh_warn!(
                        "index {} timed out (attempt {}/{}): {}",
                        operation,
                        attempt,
                        self.max_attempts,
                        err
                    );
                    tokio::time::sleep(self.backoff * attempt).await;
                    attempt += 1;
                }
                Err(err) => {
                    pmh_error!("index {} failed after {} attempt(s): {}", operation, attempt, err);
                    return Err(err);
                }
                ok => return ok,
            }
        }
    }
}

#[async_trait::async_trait]
impl<I: IndexService> IndexService for RetryingIndex<I> {
    async fn query(&self, query: &IndexQuery) -> Result<QueryResult, IndexError> {
        self.with_retry("query", || self.inner.query(query)).await
    }

    async fn distinct_value_count(
        &self,
        field: &str,
        predicate: &Query,
    ) -> Result<u64, IndexError> {
        self.with_retry("distinct count", || {
            self.inner.distinct_value_count(field, predicate)
        })
        .await
    }

    async fn field_values(
        &self,
        field: &str,
        predicate: &Query,
    ) -> Result<Vec<FieldValue>, IndexError> {
        self.with_retry("field values", || self.inner.field_values(field, predicate))
            .await
    }
}
