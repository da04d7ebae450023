//! Retry utility for transient failures in async operations
//!
//! Used by the host when bringing reactors up against brokers that are still
//! starting. Message sends are never routed through here.

use std::time::Duration;
use tokio::time::sleep;

/// Fixed-delay retry policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// Execute an async operation, retrying every failure up to the policy limit
///
/// # Examples
/// ```rust
/// use queuebridge::core::retry::{retry_async, RetryPolicy};
///
/// # async fn example() -> Result<String, String> {
/// let result = retry_async("connect", RetryPolicy::default(), || async {
///     Ok::<String, String>("connected".to_string())
/// })
/// .await?;
/// # Ok(result)
/// # }
/// ```
pub async fn retry_async<F, T, E, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_async_when(operation_name, policy, operation, |_| true).await
}

/// Execute an async operation, retrying only failures accepted by `is_transient`
///
/// A failure rejected by `is_transient` is returned immediately.
pub async fn retry_async_when<F, T, E, Fut, P>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
    is_transient: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) if attempt < max_attempts && is_transient(&error) => {
                log::debug!(
                    "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
                    operation_name,
                    attempt,
                    max_attempts,
                    policy.delay,
                    error
                );
                sleep(policy.delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
