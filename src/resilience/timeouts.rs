//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a deadline
//! - Cancel operations cleanly on timeout
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from other fetch errors
//! - Dropping the timed-out future drops any open body stream with it

use std::future::Future;
use std::time::Duration;

use crate::upstream::FetchError;

/// Run `fut` with a deadline of `ms` milliseconds.
pub async fn with_deadline<T, F>(ms: u64, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match tokio::time::timeout(Duration::from_millis(ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(ms)),
    }
}
