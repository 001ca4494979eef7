//! Error handling utilities for graceful degradation
//!
//! Helpers for operations whose failure should be logged and skipped rather
//! than propagated.

use tracing::warn;

/// Execute an operation and log errors without failing
///
/// Returns `Some(T)` on success, `None` on error (after logging).
///
/// # Example
/// ```rust
/// use modhost::utils::log_error;
///
/// let parsed = log_error(|| "42".parse::<u32>(), "Failed to parse count");
/// assert_eq!(parsed, Some(42));
/// ```
pub fn log_error<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    result_to_option(operation(), context)
}

/// Convert a Result to an Option, logging the error
///
/// Returns `Some(T)` on success, `None` on error (after logging).
pub fn result_to_option<T, E>(result: Result<T, E>, context: &str) -> Option<T>
where
    E: std::fmt::Display,
{
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_become_none() {
        assert_eq!(log_error(|| "x".parse::<u8>(), "parse"), None);
        assert_eq!(result_to_option::<_, String>(Ok(3), "ok"), Some(3));
    }
}
