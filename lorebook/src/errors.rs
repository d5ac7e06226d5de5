use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

use crate::common::{atomic, Atomic};

/// Error kinds for lorebook operations
///
/// Each kind describes a category of failure so callers and tests can
/// distinguish the real cause even where the public accessor surface
/// flattens errors into boolean/absent sentinels.
///
/// # Examples
///
/// ```rust,ignore
/// use lorebook::errors::{StoreError, ErrorKind, StoreResult};
///
/// fn example() -> StoreResult<()> {
///     Err(StoreError::new("record not found", ErrorKind::NotFound))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    /// The requested record or key was not found
    NotFound,

    /// Generic IO error from the storage layer
    IOError,

    /// A unique constraint (uuid, name, key) was violated
    UniqueConstraintViolation,

    /// Generic validation error (malformed declaration, bad argument)
    ValidationError,

    /// Error during schema migration; fatal to the open operation
    MigrationError,

    /// Error from the storage backend
    BackendError,

    /// The store has already been closed
    StoreAlreadyClosed,

    /// The operation is not valid in the current context
    InvalidOperation,

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::UniqueConstraintViolation => write!(f, "Unique constraint violation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::MigrationError => write!(f, "Migration error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::StoreAlreadyClosed => write!(f, "Store already closed"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom lorebook error type.
///
/// `StoreError` encapsulates the error message, kind, and optional cause.
/// It supports error chaining and backtraces for debugging.
///
/// # Type alias
///
/// The `StoreResult<T>` type alias is equivalent to `Result<T, StoreError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct StoreError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<StoreError>>,
    backtrace: Atomic<Backtrace>,
}

impl StoreError {
    /// Creates a new `StoreError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        StoreError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    /// Creates a new `StoreError` with an underlying cause.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: StoreError) -> Self {
        StoreError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new_unresolved()),
        }
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    /// Returns the underlying cause, if any.
    pub fn cause(&self) -> Option<&StoreError> {
        self.cause.as_deref()
    }

    /// Resolves and renders the captured backtrace.
    pub fn backtrace(&self) -> String {
        let mut guard = self.backtrace.write();
        guard.resolve();
        format!("{:?}", *guard)
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_kind, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl Debug for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreError")
            .field("message", &self.message)
            .field("error_kind", &self.error_kind)
            .field("cause", &self.cause)
            .finish()
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn Error + 'static))
    }
}

/// Result type used throughout lorebook.
pub type StoreResult<T> = Result<T, StoreError>;
