//! Error reporting helpers shared by the library and the host
//!
//! Configuration problems are something an operator can fix; broker outages
//! and transport failures are not. `ContextualError` lets the host tell the
//! two apart when it reports a fatal error.

/// Errors that know whether they carry an operator-actionable message
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; otherwise it returns `None`.
pub trait ContextualError: std::error::Error {
    /// True when the error message tells the operator what to fix
    fn is_user_actionable(&self) -> bool;

    /// The message to show the operator for actionable errors
    fn user_message(&self) -> Option<String>;
}

/// Log a fatal error with a detail level matching its kind
///
/// Actionable errors are logged with their own message. System errors are
/// logged with the operation context, and the full error goes to debug.
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => {
            log::error!("FATAL: {}: {}", operation_context, user_msg);
        }
        _ => {
            log::error!("FATAL: {}", operation_context);
        }
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
