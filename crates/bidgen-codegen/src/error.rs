//! Error types for code generation

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during transformation compilation and code generation
///
/// Every compiler error carries the raw target of the offending
/// transformation so the failure can be reported against the input.
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or unparsable path
    #[error("malformed path '{path}' in transformation '{target}': {message}")]
    MalformedPath {
        /// Raw target of the transformation
        target: String,
        /// The path that failed to parse
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// Path depth exceeds what the scope supports, or the path shape is not synthesizable
    #[error("unsupported transformation '{target}': {message}")]
    UnsupportedTransformation {
        /// Raw target of the transformation
        target: String,
        /// Error description
        message: String,
    },

    /// Static literal of a JSON kind other than number or string
    #[error("unsupported static value in transformation '{target}': {kind} values are not supported")]
    UnsupportedValueType {
        /// Raw target of the transformation
        target: String,
        /// JSON kind of the rejected value
        kind: &'static str,
    },

    /// Scope marker of a path is inconsistent with the transformation's scope
    #[error("ambiguous source in transformation '{target}': {message}")]
    AmbiguousSource {
        /// Raw target of the transformation
        target: String,
        /// Error description
        message: String,
    },

    /// Transformation record violates the static/copy invariant
    #[error("invalid transformation '{target}': {message}")]
    InvalidTransformation {
        /// Raw target of the transformation
        target: String,
        /// Error description
        message: String,
    },

    /// A copy source dereferenced a missing intermediate object while interpreting a program
    #[error("null dereference evaluating '{expression}'")]
    NullDereference {
        /// Rendered access expression that failed
        expression: String,
    },

    /// Object graph handed to the interpreter has the wrong shape
    #[error("invalid object graph: {0}")]
    InvalidObjectGraph(String),

    /// Invalid Jinja template
    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] minijinja::Error),

    /// Input description or configuration error
    #[error(transparent)]
    Core(#[from] bidgen_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
