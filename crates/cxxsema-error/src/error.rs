//! The main Error type for cxxsema.

use crate::ErrorKind;
use std::fmt;

/// Unified error type for the fallible parts of cxxsema.
pub struct Error {
    kind: ErrorKind,
    message: String,
    operation: &'static str,
    context: Vec<(&'static str, String)>,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Create a new error with the given kind and message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            operation: "",
            context: Vec::new(),
            source: None,
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the operation that caused this error
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Get the context key-value pairs
    pub fn context(&self) -> &[(&'static str, String)] {
        &self.context
    }

    /// Look up a context value by key.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get the source error (if any).
    pub fn source_ref(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.source.as_ref().map(|e| e.as_ref())
    }

    /// Set the operation that caused this error.
    ///
    /// If an operation was already set, the previous one is moved to context
    /// as "called" to preserve the call chain.
    pub fn with_operation(mut self, operation: &'static str) -> Self {
        if !self.operation.is_empty() {
            self.context.push(("called", self.operation.to_string()));
        }
        self.operation = operation;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.context.push((key, value.into()));
        self
    }

    /// Set the source error.
    ///
    /// # Panics (debug only)
    /// Panics in debug mode if source was already set.
    pub fn set_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        debug_assert!(self.source.is_none(), "source error already set");
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.operation.is_empty() {
            write!(f, " at {}", self.operation)?;
        }

        if !self.context.is_empty() {
            write!(f, ", context {{ ")?;
            for (i, (key, value)) in self.context.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", key, value)?;
            }
            write!(f, " }}")?;
        }

        if !self.message.is_empty() {
            write!(f, " => {}", self.message)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} at {}", self.kind, self.operation)?;

        if !self.message.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Message: {}", self.message)?;
        }

        if !self.context.is_empty() {
            writeln!(f)?;
            writeln!(f, "    Context:")?;
            for (key, value) in &self.context {
                writeln!(f, "        {}: {}", key, value)?;
            }
        }

        if let Some(source) = &self.source {
            writeln!(f)?;
            writeln!(f, "    Source: {:?}", source)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IoFailed,
        };
        Error::new(kind, err.to_string())
            .with_operation("io")
            .set_source(err)
    }
}

// Convenience constructors
impl Error {
    /// Create an Unsupported error for a piece of syntax
    pub fn unsupported(what: impl Into<String>) -> Self {
        let what = what.into();
        Self::new(ErrorKind::Unsupported, format!("'{}' is not supported", what))
            .with_context("syntax", what)
    }

    /// Create a ConfigInvalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create a ParseFailed error
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseFailed, message)
    }

    /// Create a FileNotFound error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::new(ErrorKind::FileNotFound, format!("file '{}' not found", path))
            .with_context("path", path)
    }

    /// Create an ExprNotFound error
    pub fn expr_not_found(index: u32) -> Self {
        Self::new(
            ErrorKind::ExprNotFound,
            format!("expression #{} is not part of this tree", index),
        )
        .with_context("expr", index.to_string())
    }

    /// Create an InvalidArgument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::new(ErrorKind::ParseFailed, "unexpected token");
        assert_eq!(err.kind(), ErrorKind::ParseFailed);
        assert_eq!(err.message(), "unexpected token");
        assert!(err.source_ref().is_none());
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::new(ErrorKind::Unsupported, "lambda")
            .with_operation("cpp::lower_expr")
            .with_context("kind", "lambda_expression")
            .with_context("line", "7");

        assert_eq!(err.operation(), "cpp::lower_expr");
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context_value("line"), Some("7"));
        assert_eq!(err.context_value("missing"), None);
    }

    #[test]
    fn test_operation_chaining() {
        let err = Error::new(ErrorKind::Unsupported, "failed")
            .with_operation("cpp::lower_expr")
            .with_operation("cpp::collect");

        assert_eq!(err.operation(), "cpp::collect");
        assert_eq!(
            err.context()[0],
            ("called", "cpp::lower_expr".to_string())
        );
    }

    #[test]
    fn test_display() {
        let err = Error::new(ErrorKind::ParseFailed, "unexpected EOF")
            .with_operation("cpp::parse")
            .with_context("file", "main.cpp");

        let display = format!("{}", err);
        assert!(display.contains("ParseFailed"));
        assert!(display.contains("cpp::parse"));
        assert!(display.contains("file: main.cpp"));
        assert!(display.ends_with("=> unexpected EOF"));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = Error::unsupported("lambda_expression");
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        assert!(err.message().contains("lambda_expression"));

        let err = Error::expr_not_found(12);
        assert_eq!(err.kind(), ErrorKind::ExprNotFound);
        assert_eq!(err.context_value("expr"), Some("12"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
        assert_eq!(err.operation(), "io");
        assert!(err.source_ref().is_some());
    }
}
