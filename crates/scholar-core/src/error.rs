//! Error types for Scholar Core

use thiserror::Error;

/// Result type alias using the Scholar Error
pub type Result<T> = std::result::Result<T, Error>;

/// Scholar error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to server '{name}': {reason}")]
    Connection { name: String, reason: String },

    #[error("Capability '{name}' is declared by both '{first}' and '{second}'")]
    CapabilityCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Capability call failed: {0}")]
    Dispatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
