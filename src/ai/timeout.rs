//! Timeout helpers
//!
//! A hung provider call must fail its agent rather than stall it forever,
//! so every generation goes through [`with_timeout`].
//!
//! ## Usage
//!
//! ```ignore
//! use hookforge::ai::timeout::with_timeout;
//!
//! let response = with_timeout(
//!     Duration::from_secs(120),
//!     provider.generate(&prompt, &schema),
//!     "Polariser generation",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{HookError, Result};

/// Execute an async operation with a timeout
///
/// Returns [`HookError::Timeout`] if the operation doesn't complete within
/// the specified duration. The inner future is dropped on expiry.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(HookError::timeout(operation_name, timeout)),
    }
}
