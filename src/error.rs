//! Error types for InsightHub
//!
//! This module defines the crate-level error type used by configuration,
//! credential storage, and the command layer, using `thiserror` for
//! ergonomic error handling.
//!
//! Workbench operations do not use this type; they return a classified
//! [`Failure`](crate::workbench::Failure) so the caller always receives a
//! user-facing outcome.

use thiserror::Error;

/// Main error type for InsightHub operations
#[derive(Error, Debug)]
pub enum InsightHubError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential storage errors that are not keyring specific
    #[error("Credential storage error: {0}")]
    Credentials(String),

    /// Not logged in when a command requires a session
    #[error("Not authenticated: run `insighthub login` first")]
    NotAuthenticated,

    /// Export delivery errors (writing the downloaded artifact)
    #[error("Export delivery error: {0}")]
    Delivery(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for InsightHub operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
