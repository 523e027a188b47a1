/*!
 * Error types for the persian-rtl engine.
 *
 * This module contains custom error types for the different parts of the
 * engine, using the thiserror crate for ergonomic error definitions.
 */

use ego_tree::NodeId;
use thiserror::Error;

/// Errors raised by the live document when a node cannot be used
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomError {
    /// The node id does not belong to this document
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    /// The operation needs an element but got a text, comment or document node
    #[error("Node is not an element: {0:?}")]
    NotAnElement(NodeId),

    /// The operation needs a text node
    #[error("Node is not a text node: {0:?}")]
    NotText(NodeId),
}

/// Errors that can occur when reading user settings
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The backing store could not be read
    #[error("Settings store unavailable: {0}")]
    Unavailable(String),

    /// The stored record could not be decoded
    #[error("Malformed settings: {0}")]
    Malformed(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the live document
    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    /// Error from the settings store
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        Self::Malformed(error.to_string())
    }
}
