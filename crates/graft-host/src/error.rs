//! Per-thread error indicator
//!
//! Adapters report failure by setting the indicator and returning null or
//! `-1`; the caller takes the error back out with [`take_error`].

use std::cell::RefCell;

use graft_sdk::ErrorKind;
use thiserror::Error;

/// A raised host error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct HostError {
    /// Error class
    pub kind: ErrorKind,
    /// Message
    pub message: String,
}

impl HostError {
    /// Build an error value without raising it
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        HostError {
            kind,
            message: message.into(),
        }
    }
}

/// Result type of host-level operations
pub type HostResult<T> = Result<T, HostError>;

thread_local! {
    static INDICATOR: RefCell<Option<HostError>> = const { RefCell::new(None) };
}

/// Set the indicator, replacing any pending error
pub fn set_error(kind: ErrorKind, message: &str) {
    tracing::trace!(%kind, message, "error raised");
    INDICATOR.with(|slot| *slot.borrow_mut() = Some(HostError::new(kind, message)));
}

/// Take and clear the pending error
pub fn take_error() -> Option<HostError> {
    INDICATOR.with(|slot| slot.borrow_mut().take())
}

/// Whether an error is pending
pub fn error_occurred() -> bool {
    INDICATOR.with(|slot| slot.borrow().is_some())
}

/// The pending error, or a `SystemError` noting that none was set
pub(crate) fn take_or_missing(context: &str) -> HostError {
    take_error().unwrap_or_else(|| {
        HostError::new(
            ErrorKind::SystemError,
            format!("{} returned a failure without setting an error", context),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_clears() {
        set_error(ErrorKind::TypeError, "bad");
        assert!(error_occurred());
        assert_eq!(take_error(), Some(HostError::new(ErrorKind::TypeError, "bad")));
        assert!(!error_occurred());
        assert_eq!(take_error(), None);
    }

    #[test]
    fn test_latest_error_wins() {
        set_error(ErrorKind::TypeError, "first");
        set_error(ErrorKind::OverflowError, "second");
        let err = take_error().unwrap();
        assert_eq!(err.kind, ErrorKind::OverflowError);
        assert_eq!(err.to_string(), "OverflowError: second");
    }

    #[test]
    fn test_missing_error_is_system_error() {
        let err = take_or_missing("slot");
        assert_eq!(err.kind, ErrorKind::SystemError);
    }
}
