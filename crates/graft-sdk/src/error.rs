//! Error types for the graft SDK

/// Result type for registration and installation calls
pub type GraftResult<T> = Result<T, GraftError>;

/// Errors raised while wiring native types into the host.
///
/// These cover the registration side only. Failures inside a host call
/// (marshalling mismatches, unsupported operators) travel through the host's
/// own error indicator, see [`ErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraftError {
    /// No host runtime has been installed yet
    #[error("no host runtime installed")]
    NoHost,

    /// `host::install` was called twice
    #[error("a host runtime is already installed")]
    HostAlreadyInstalled,

    /// The same native type was registered twice
    #[error("type '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The host refused to ready a type descriptor
    #[error("host rejected type '{name}': {reason}")]
    NotReady {
        /// Name of the rejected type
        name: String,
        /// Reason given by the host
        reason: String,
    },

    /// The host module-creation primitive returned nothing
    #[error("module '{0}' could not be created")]
    ModuleCreation(String),

    /// An attribute could not be attached to a module
    #[error("could not add '{0}' to module")]
    ModuleAttribute(String),

    /// Host storage allocation returned nothing
    #[error("allocation failed for '{0}'")]
    Allocation(String),
}

/// Host error classes a native adapter can raise.
///
/// Mirrors the exception classes the host exposes. Adapters set one of these
/// through [`HostRuntime::set_error`](crate::HostRuntime::set_error) and then
/// return the host failure value (null or `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong argument count or type
    TypeError,
    /// Right type, unusable value
    ValueError,
    /// Integer does not fit the requested width
    OverflowError,
    /// Allocation failure
    MemoryError,
    /// Failure inside native code
    RuntimeError,
    /// Internal inconsistency (bad descriptor, missing host)
    SystemError,
}

impl ErrorKind {
    /// Host-visible class name
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::ValueError => "ValueError",
            ErrorKind::OverflowError => "OverflowError",
            ErrorKind::MemoryError => "MemoryError",
            ErrorKind::RuntimeError => "RuntimeError",
            ErrorKind::SystemError => "SystemError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
