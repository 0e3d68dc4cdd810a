use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// The main error type for Proxmox VE operations.
///
/// Every public operation returns this type. Failures raised below the
/// resource layer are wrapped in [`ProxmoxError::Operation`] so the caller
/// sees which operation and which remote object were involved; use
/// [`ProxmoxError::root_cause`] to match on the underlying failure.
#[derive(Error, Debug)]
pub enum ProxmoxError {
    /// The transport failed before a response was received
    /// (connection refused, TLS failure, timeout).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The login call was rejected.
    ///
    /// # Fields
    /// * `status` - HTTP status returned by the ticket endpoint
    /// * `body` - Raw response body, kept for diagnostics
    #[error("Authentication error ({status}): {body}")]
    Authentication { status: u16, body: String },

    /// An authenticated call returned a non-2xx status.
    ///
    /// The remote API embeds its error detail in the body, so it is preserved.
    #[error("API error ({status}): {body}")]
    Request { status: u16, body: String },

    /// A response payload or a descriptor string could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// A client-side precondition failed; raised before any request is sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A remote task stopped without reporting success.
    #[error("Task {upid} failed: {reason}")]
    TaskFailed { upid: String, reason: TaskFailure },

    /// A task did not stop before the caller's deadline.
    #[error("Task {upid} still running after {waited:?}")]
    TaskTimeout { upid: String, waited: Duration },

    /// Wraps a failure with the operation and resource it happened on.
    #[error("{operation} on '{resource}' failed: {source}")]
    Operation {
        operation: &'static str,
        resource: String,
        source: Box<ProxmoxError>,
    },
}

impl ProxmoxError {
    /// Returns the innermost error, skipping any operation context.
    #[must_use]
    pub fn root_cause(&self) -> &ProxmoxError {
        let mut current = self;
        while let ProxmoxError::Operation { source, .. } = current {
            current = source;
        }
        current
    }
}

impl From<serde_json::Error> for ProxmoxError {
    fn from(error: serde_json::Error) -> Self {
        ProxmoxError::Decode(error.to_string())
    }
}

/// Why a remote task is considered failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The task stopped with an exit status other than `OK`.
    ExitStatus(String),
    /// The task stopped but the remote never reported an exit status.
    NoExitStatus,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::ExitStatus(status) => write!(f, "exit status '{}'", status),
            TaskFailure::NoExitStatus => f.write_str("no exit status"),
        }
    }
}

/// Specialized error type for validation failures.
///
/// This enum provides detailed context about why a validation
/// failed, including field-specific errors and format violations.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Represents a validation failure for a specific field
    ///
    /// # Fields
    /// * `field` - The name of the field that failed validation
    /// * `message` - A detailed message about why validation failed
    #[error("Field '{field}' validation failed: {message}")]
    Field { field: String, message: String },

    /// Represents format/syntax validation failures
    #[error("Format error: {0}")]
    Format(String),

    /// Represents violations of domain constraints
    #[error("Domain constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Type alias for Results that may fail with a ProxmoxError
pub type ProxmoxResult<T> = Result<T, ProxmoxError>;

/// Attaches operation context to a failed result.
pub(crate) trait ResultExt<T> {
    fn context<F>(self, operation: &'static str, resource: F) -> ProxmoxResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for ProxmoxResult<T> {
    fn context<F>(self, operation: &'static str, resource: F) -> ProxmoxResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|source| ProxmoxError::Operation {
            operation,
            resource: resource(),
            source: Box::new(source),
        })
    }
}
