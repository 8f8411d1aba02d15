//! Error kinds for cxxsema operations

use strum_macros::{Display, IntoStaticStr};

/// The kind of error that occurred.
///
/// Callers match on the kind to decide whether to skip a single probe, a
/// whole file, or abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr, Display)]
#[non_exhaustive]
pub enum ErrorKind {
    // =========================================================================
    // General errors
    // =========================================================================
    /// The syntax or operation is valid C++ but not handled here
    Unsupported,

    /// Invalid configuration or parameters
    ConfigInvalid,

    // =========================================================================
    // Parse errors
    // =========================================================================
    /// tree-sitter could not produce a tree for the source
    ParseFailed,

    // =========================================================================
    // Expression tree errors
    // =========================================================================
    /// An expression id does not belong to the tree
    ExprNotFound,

    /// An operand is already attached to another expression
    OperandShared,

    // =========================================================================
    // File/IO errors
    // =========================================================================
    /// File not found
    FileNotFound,

    /// Permission denied
    PermissionDenied,

    /// IO operation failed
    IoFailed,

    /// Directory traversal failed
    TraversalFailed,

    // =========================================================================
    // Serialization errors
    // =========================================================================
    /// Serialization failed
    SerializationFailed,

    // =========================================================================
    // Validation errors
    // =========================================================================
    /// Invalid argument passed to function
    InvalidArgument,
}

impl ErrorKind {
    /// Returns the error kind as a static string
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ParseFailed.to_string(), "ParseFailed");
        assert_eq!(ErrorKind::OperandShared.as_str(), "OperandShared");
    }
}
