//! # cxxsema-error
//!
//! Error handling for the fallible edges of cxxsema: reading files, parsing
//! C++ with tree-sitter, lowering syntax into expression trees and loading
//! configuration.
//!
//! Type resolution itself never fails with an [`Error`]. Semantic failures
//! are problem types and travel as ordinary values.
//!
//! ## Usage
//!
//! ```rust
//! use cxxsema_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::Unsupported, "lambda expressions are not lowered")
//!         .with_operation("cpp::lower_expr")
//!         .with_context("file", "src/main.cpp")
//!         .with_context("line", "42"))
//! }
//! ```
//!
//! ## Principles
//!
//! - Fallible functions return `Result<T, cxxsema_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - An error is handled once, callers further up only append context

mod error;
mod kind;

pub use error::Error;
pub use kind::ErrorKind;

/// Result type alias using the cxxsema Error
pub type Result<T> = std::result::Result<T, Error>;
