//! Unit-of-work helpers
//!
//! A lifecycle attempt is `begin -> body -> settle`, run under a timeout. The
//! whole attempt is what [`core_kernel::with_retry`] repeats.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use core_kernel::PortError;
use crate::error::LifecycleError;
use crate::ports::UnitOfWork;

/// Commits on success and rolls back on failure
///
/// A failed rollback is logged; the original error is still returned.
pub async fn settle<T>(
    uow: Box<dyn UnitOfWork>,
    result: Result<T, LifecycleError>,
) -> Result<T, LifecycleError> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(error) => {
            if let Err(rollback_error) = uow.rollback().await {
                warn!(error = %rollback_error, "Rollback failed");
            }
            Err(error)
        }
    }
}

/// Runs one attempt under `budget`
///
/// On timeout the attempt future is dropped, which discards its unit of work,
/// and a transient error is returned so the attempt can be retried.
pub async fn within_timeout<T, F>(budget: Duration, operation: &str, attempt: F) -> Result<T, LifecycleError>
where
    F: Future<Output = Result<T, LifecycleError>>,
{
    match tokio::time::timeout(budget, attempt).await {
        Ok(result) => result,
        Err(_) => Err(LifecycleError::from(PortError::Timeout {
            operation: operation.to_string(),
            duration_ms: budget.as_millis() as u64,
        })),
    }
}
