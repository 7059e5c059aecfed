//! Deadlines for calls that leave the service.

use std::future::Future;
use std::time::Duration;

use crate::error::SagaError;

/// Deadlines applied to store access and publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    /// Single reads, writes and publishes.
    pub call: Duration,
    /// Bulk initialization such as resetting load counters.
    pub init: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            call: Duration::from_secs(5),
            init: Duration::from_secs(30),
        }
    }
}

/// Runs a fallible call with a deadline.
///
/// A call that does not finish in time is abandoned and reported as
/// [`SagaError::Timeout`]; nothing is retried.
pub async fn bounded<T, E, F>(
    deadline: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, SagaError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<SagaError>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => {
            tracing::warn!(operation, ?deadline, "call timed out");
            Err(SagaError::Timeout {
                operation,
                after: deadline,
            })
        }
    }
}
