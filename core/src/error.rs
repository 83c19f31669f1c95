//! Error taxonomy and exit codes.
//!
//! Every failure that crosses the dispatcher is an [`Error`]: either a single
//! [`ExitError`] carrying a code, or an [`ExitErrorCollector`] aggregating
//! several of them. Only the application shell turns an error into a process
//! exit code.
//!
//! # Example
//!
//! ```
//! use cmdkit_core::{Error, ExitErrorCollector, EXIT_CODE_NOT_FOUND_FLAG};
//!
//! let err = Error::not_found_flag("port");
//! assert_eq!(err.to_string(), "flag 'port' not found");
//! assert_eq!(err.code(), EXIT_CODE_NOT_FOUND_FLAG);
//!
//! let mut errors = ExitErrorCollector::new();
//! errors.push(err);
//! errors.push(Error::new("disk full", 7));
//! assert_eq!(errors.to_string(), "flag 'port' not found\ndisk full");
//! assert_eq!(errors.code(), EXIT_CODE_NOT_FOUND_FLAG);
//! ```

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by hooks, actions and validators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Successful completion.
pub const EXIT_CODE_SUCCESS: i32 = 0;
/// Used by the shell when a classified error claims code 0.
pub const EXIT_CODE_FAILURE: i32 = 1;
/// Unclassified application failure.
pub const EXIT_CODE_APPLICATION: i32 = 1001;
/// A provider or the argument parser could not set a flag.
pub const EXIT_CODE_FLAG_PROCESSING: i32 = 1002;
/// A required flag has no value.
pub const EXIT_CODE_NOT_FOUND_FLAG: i32 = 1003;
/// A positional argument names no known command or help topic.
pub const EXIT_CODE_NOT_FOUND_COMMAND: i32 = 1004;

/// A message paired with an exit code and an optional underlying cause.
#[derive(Debug, Clone)]
pub struct ExitError {
    code: Option<i32>,
    message: String,
    cause: Option<Arc<dyn std::error::Error + Send + Sync + 'static>>,
}

impl ExitError {
    /// Creates an error with the given message and code.
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
            cause: None,
        }
    }

    /// Creates an error whose message is the cause's message.
    pub fn from_cause(cause: impl Into<BoxError>, code: i32) -> Self {
        Self {
            code: Some(code),
            ..Self::unclassified(cause)
        }
    }

    /// An error without a code of its own. It reports
    /// [`EXIT_CODE_APPLICATION`] but never wins the code of a collector.
    fn unclassified(cause: impl Into<BoxError>) -> Self {
        let cause: BoxError = cause.into();
        Self {
            code: None,
            message: cause.to_string(),
            cause: Some(Arc::from(cause)),
        }
    }

    /// Attaches an underlying cause, reachable through `source()`.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(Arc::from(cause.into()));
        self
    }

    /// Returns a copy of this error carrying a different code.
    pub fn with_code(&self, code: i32) -> Self {
        Self {
            code: Some(code),
            ..self.clone()
        }
    }

    /// Exit code of this error.
    pub fn code(&self) -> i32 {
        self.code.unwrap_or(EXIT_CODE_APPLICATION)
    }

    /// Whether the error carries a code of its own.
    pub fn is_classified(&self) -> bool {
        self.code.is_some()
    }

    /// Message of this error, without the cause chain.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}

/// An ordered list of errors reported together.
///
/// The message is the members' messages joined with newlines. The code is the
/// first classified code among the members, or [`EXIT_CODE_APPLICATION`].
#[derive(Debug, Clone, Default)]
pub struct ExitErrorCollector(Vec<Error>);

impl ExitErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error. Nested collectors are flattened.
    pub fn push(&mut self, err: impl Into<Error>) {
        match err.into() {
            Error::Collected(inner) => self.0.extend(inner.0),
            err => self.0.push(err),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Error> {
        self.0.iter()
    }

    /// Returns the sole member when the collector holds exactly one error.
    pub fn unwrap(&self) -> Option<&Error> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Exit code of the collection.
    pub fn code(&self) -> i32 {
        self.classified_code().unwrap_or(EXIT_CODE_APPLICATION)
    }

    fn classified_code(&self) -> Option<i32> {
        self.0.iter().find_map(Error::classified_code)
    }

    /// `Ok(())` when empty, otherwise the collection as an error.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Collected(self))
        }
    }
}

impl fmt::Display for ExitErrorCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExitErrorCollector {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.unwrap().map(|err| err as &(dyn std::error::Error + 'static))
    }
}

impl Extend<Error> for ExitErrorCollector {
    fn extend<I: IntoIterator<Item = Error>>(&mut self, iter: I) {
        for err in iter {
            self.push(err);
        }
    }
}

impl FromIterator<Error> for ExitErrorCollector {
    fn from_iter<I: IntoIterator<Item = Error>>(iter: I) -> Self {
        let mut collector = Self::new();
        collector.extend(iter);
        collector
    }
}

/// Errors produced by dispatch, providers, validation and user callbacks.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A single classified error.
    #[error(transparent)]
    Exit(#[from] ExitError),

    /// Several errors reported together.
    #[error(transparent)]
    Collected(#[from] ExitErrorCollector),
}

impl Error {
    /// Creates a single error with the given message and code.
    pub fn new(message: impl Into<String>, code: i32) -> Self {
        Self::Exit(ExitError::new(message, code))
    }

    /// A required flag has no value (code 1003).
    pub fn not_found_flag(name: &str) -> Self {
        Self::new(format!("flag '{name}' not found"), EXIT_CODE_NOT_FOUND_FLAG)
    }

    /// A command or help topic could not be resolved (code 1004).
    pub fn not_found_command(name: &str) -> Self {
        Self::new(
            format!("command '{name}' not found"),
            EXIT_CODE_NOT_FOUND_COMMAND,
        )
    }

    /// A provider failed to set a flag (code 1002).
    pub fn flag(prefix: &str, name: &str, cause: impl Into<BoxError>) -> Self {
        let cause: BoxError = cause.into();
        Self::Exit(
            ExitError::new(
                format!("provider '{prefix}' failed to set a flag '{name}': {cause}"),
                EXIT_CODE_FLAG_PROCESSING,
            )
            .with_cause(cause),
        )
    }

    /// Promotes a foreign error to an application error (code 1001).
    pub fn wrap(cause: impl Into<BoxError>) -> Self {
        Self::Exit(ExitError::from_cause(cause, EXIT_CODE_APPLICATION))
    }

    /// Converts an error returned by user code, keeping its class when it
    /// already is one of ours. Foreign errors report
    /// [`EXIT_CODE_APPLICATION`] while leaving a collector's code to its
    /// classified members.
    pub fn from_boxed(err: BoxError) -> Self {
        let err = match err.downcast::<Error>() {
            Ok(err) => return *err,
            Err(err) => err,
        };
        let err = match err.downcast::<ExitError>() {
            Ok(err) => return Self::Exit(*err),
            Err(err) => err,
        };
        match err.downcast::<ExitErrorCollector>() {
            Ok(collector) => Self::Collected(*collector),
            Err(err) => Self::Exit(ExitError::unclassified(err)),
        }
    }

    /// Exit code of this error.
    pub fn code(&self) -> i32 {
        self.classified_code().unwrap_or(EXIT_CODE_APPLICATION)
    }

    fn classified_code(&self) -> Option<i32> {
        match self {
            Self::Exit(err) => err.code,
            Self::Collected(collector) => collector.classified_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_flag_error_message_and_code() {
        let err = Error::flag("env", "num", "invalid digit");
        assert_eq!(
            err.to_string(),
            "provider 'env' failed to set a flag 'num': invalid digit"
        );
        assert_eq!(err.code(), EXIT_CODE_FLAG_PROCESSING);
        assert_eq!(err.source().map(|s| s.to_string()), Some("invalid digit".into()));
    }

    #[test]
    fn test_with_code_keeps_message() {
        let err = ExitError::new("boom", 3);
        let copy = err.with_code(42);
        assert_eq!(copy.code(), 42);
        assert_eq!(copy.message(), "boom");
        assert_eq!(err.code(), 3);
    }

    #[test]
    fn test_collector_code_defaults_to_application() {
        let collector = ExitErrorCollector::new();
        assert_eq!(collector.code(), EXIT_CODE_APPLICATION);
        assert!(collector.into_result().is_ok());
    }

    #[test]
    fn test_collector_code_is_first_classified() {
        let collector: ExitErrorCollector = vec![
            Error::not_found_command("x"),
            Error::not_found_flag("y"),
        ]
        .into_iter()
        .collect();
        assert_eq!(collector.code(), EXIT_CODE_NOT_FOUND_COMMAND);
    }

    #[test]
    fn test_collector_flattens_nested_collectors() {
        let mut inner = ExitErrorCollector::new();
        inner.push(Error::new("E1", 5));
        let mut outer = ExitErrorCollector::new();
        outer.push(inner);
        outer.push(Error::new("E2", 6));
        assert_eq!(outer.len(), 2);
        assert_eq!(outer.to_string(), "E1\nE2");
    }

    #[test]
    fn test_collector_unwrap_requires_single_member() {
        let mut collector = ExitErrorCollector::new();
        collector.push(Error::new("only", 9));
        assert_eq!(collector.unwrap().map(Error::code), Some(9));
        collector.push(Error::new("second", 9));
        assert!(collector.unwrap().is_none());
    }

    #[test]
    fn test_from_boxed_keeps_classified_errors() {
        let boxed: BoxError = Box::new(ExitError::new("custom", 12));
        assert_eq!(Error::from_boxed(boxed).code(), 12);

        let boxed: BoxError = Box::new(Error::not_found_flag("a"));
        assert_eq!(Error::from_boxed(boxed).code(), EXIT_CODE_NOT_FOUND_FLAG);

        let boxed: BoxError = "plain".into();
        let err = Error::from_boxed(boxed);
        assert_eq!(err.code(), EXIT_CODE_APPLICATION);
        assert_eq!(err.to_string(), "plain");
    }

    #[test]
    fn test_foreign_errors_do_not_claim_collector_code() {
        let mut collector = ExitErrorCollector::new();
        collector.push(Error::from_boxed("E1".into()));
        collector.push(Error::new("E2", 42));
        assert_eq!(collector.code(), 42);

        let mut collector = ExitErrorCollector::new();
        collector.push(Error::from_boxed("E1".into()));
        collector.push(Error::from_boxed("E2".into()));
        assert_eq!(collector.code(), EXIT_CODE_APPLICATION);
    }
}
