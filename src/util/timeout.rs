//! Deadline for a single tool execution.

use std::future::Future;
use std::time::Duration;

use crate::error::HelmError;

/// Run `future` under `limit`. Expiry drops the future and becomes
/// [`HelmError::Timeout`] carrying the limit in milliseconds, which the turn
/// loop reports as a recoverable tool failure.
pub async fn with_timeout<T>(
    limit: Duration,
    future: impl Future<Output = Result<T, HelmError>>,
) -> Result<T, HelmError> {
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or_else(|_elapsed| Err(HelmError::Timeout(limit.as_millis() as u64)))
}
