//! The persistent store contract.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::types::RecapRecord;

/// Query budget applied when the caller has no deadline of its own.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable lookup of recap records.
///
/// Implementations must be thread-safe (`Send + Sync`); a single instance is
/// shared by every in-flight request.
#[async_trait]
pub trait RecapStore: Send + Sync {
    /// Short backend name used in health reports and logs.
    fn name(&self) -> &'static str;

    /// Fetches the recap record for `user_id`.
    ///
    /// Returns `None` if no row matches. The lookup is bounded by
    /// [`effective_deadline`]: the caller's `deadline` is never extended.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Timeout` if the deadline passes before the row
    /// arrives, and another variant for any other failure.
    async fn fetch_recap(
        &self,
        user_id: u32,
        deadline: Option<Instant>,
    ) -> Result<Option<RecapRecord>, StoreError>;

    /// Performs a lightweight liveness check against the backend.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Computes the instant a store query must finish by.
///
/// Without a caller deadline the query gets `query_timeout` from now. With
/// one, the earlier of the two wins.
#[must_use]
pub fn effective_deadline(caller: Option<Instant>, query_timeout: Duration) -> Instant {
    let own = Instant::now() + query_timeout;
    match caller {
        Some(deadline) => deadline.min(own),
        None => own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_effective_deadline_without_caller() {
        let before = Instant::now();
        let deadline = effective_deadline(None, Duration::from_secs(5));
        assert!(deadline >= before + Duration::from_secs(5));
        assert!(deadline <= Instant::now() + Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_effective_deadline_keeps_earlier_caller_deadline() {
        let caller = Instant::now() + Duration::from_millis(100);
        assert_eq!(
            effective_deadline(Some(caller), Duration::from_secs(5)),
            caller
        );
    }

    #[tokio::test]
    async fn test_effective_deadline_caps_later_caller_deadline() {
        let caller = Instant::now() + Duration::from_secs(60);
        let deadline = effective_deadline(Some(caller), Duration::from_secs(5));
        assert!(deadline < caller);
    }
}
