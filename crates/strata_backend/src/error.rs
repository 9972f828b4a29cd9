// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache and backend operations.

use std::fmt;

/// The broad category of an [`Error`].
///
/// Absence of a value is never an error; lookups that find nothing return `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The cache is misconfigured: no layers are present, or a value provider prefix
    /// overlaps one that is already registered.
    Configuration,
    /// A backend call failed. The failure is propagated unmodified.
    Backend,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => f.write_str("configuration error"),
            Self::Backend => f.write_str("backend error"),
        }
    }
}

/// An error from a cache operation.
///
/// This is an opaque error type that can wrap any underlying error from a backend
/// implementation. Use [`std::error::Error::source()`] to access the underlying
/// cause if needed, and [`Error::kind`] to tell configuration mistakes apart from
/// backend failures.
///
/// # Example
///
/// ```
/// use strata_backend::{Error, ErrorKind};
///
/// let error = Error::from_message("connection reset");
/// assert_eq!(error.kind(), ErrorKind::Backend);
/// ```
#[ohno::error]
#[display("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a configuration error with the given explanation.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_backend::{Error, ErrorKind};
    ///
    /// let error = Error::configuration("at least one layer should be configured");
    /// assert_eq!(error.kind(), ErrorKind::Configuration);
    /// ```
    pub fn configuration(message: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Configuration, message)
    }

    /// Creates a backend error wrapping the given cause.
    pub fn backend(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backend, cause)
    }

    /// Creates a new error from any type that can be converted to an error.
    ///
    /// This is the public API for creating backend errors from external crates.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_backend::Error;
    ///
    /// let error = Error::from_message("operation failed");
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::backend(cause)
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        self.kind == ErrorKind::Configuration
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_display_contains_message() {
        let error = Error::configuration("no layers");
        let display_str = format!("{error}");
        assert!(display_str.contains("configuration error"), "got: {display_str}");
        assert!(display_str.contains("no layers"), "got: {display_str}");
    }

    #[test]
    fn backend_error_debug_contains_cause_message() {
        let error = Error::backend("test error message");
        let debug_str = format!("{error:?}");
        assert!(
            debug_str.contains("test error message"),
            "debug output should contain the cause message, got: {debug_str}"
        );
    }

    #[test]
    fn kinds_are_distinguishable() {
        assert!(Error::configuration("x").is_configuration());
        assert!(!Error::from_message("x").is_configuration());
        assert_eq!(Error::from_message("x").kind(), ErrorKind::Backend);
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::backend("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(format!("{err}").contains("expected failure"));
    }
}
