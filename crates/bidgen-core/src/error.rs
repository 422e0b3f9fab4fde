//! Error types for bidgen-core

use thiserror::Error;

/// Result type alias for bidgen-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in bidgen-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// A bidder description file could not be parsed
    #[error("failed to parse bidder description '{path}': {message}")]
    DescriptionParse {
        /// Path of the description file
        path: String,
        /// Parser error message
        message: String,
    },

    /// Bidder description is structurally invalid
    #[error("invalid bidder description '{bidder}': {message}")]
    InvalidDescription {
        /// Bidder name (or file name when the name is missing)
        bidder: String,
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
