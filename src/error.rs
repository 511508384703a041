//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout the connector.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `ConnectionFailed`: No usable connection handle; the caller must reconnect
//! - `Timeout`: Network timeout while connecting or probing
//! - `AuthorizationAmbiguous`: Command rejected for lack of privilege (the server is reachable)
//! - `MalformedCommand`: Command body could not be parsed into a command document
//! - `Serialization`: Database reply could not be turned into the output representation
//! - `CommandFailed`: The database rejected the command
//! - `InvalidInput`: Malformed input or missing required parameters
//! - `EngineError`: Driver errors that fit no other category
//! - `ConfigError`: Configuration file or datasource registry errors

use thiserror::Error;

/// Main error type for connector operations
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// No usable connection handle (stale, closed, or never opened)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Network timeout during connect, probe, or command execution
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Insufficient privilege; proves the server is reachable and credentials were accepted
    #[error("Not authorized: {0}")]
    AuthorizationAmbiguous(String),

    /// Command body is not a parseable command document
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Reply could not be converted to the output representation
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database reported a command failure
    #[error("Command failed ({code_name}, code {code}): {message}")]
    CommandFailed { code: i32, code_name: String, message: String },

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Engine-specific database error
    #[error("Engine error ({engine}): {detail}")]
    EngineError { engine: String, detail: String },

    /// Configuration error (file not found, invalid JSON, etc.)
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ConnectorError {
    /// Convert error to error code string for JSON output
    ///
    /// Error codes are stable and suitable for programmatic handling.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::AuthorizationAmbiguous(_) => "AUTHORIZATION_AMBIGUOUS",
            Self::MalformedCommand(_) => "MALFORMED_COMMAND",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::CommandFailed { .. } => "COMMAND_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::EngineError { .. } => "ENGINE_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
        }
    }

    /// Get human-readable error message (no credentials)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether the caller has to acquire a new connection before trying again
    ///
    /// The same handle is never retried internally.
    #[must_use]
    pub const fn requires_reconnect(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_))
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Create an authorization error
    pub fn authorization_ambiguous(message: impl Into<String>) -> Self {
        Self::AuthorizationAmbiguous(message.into())
    }

    /// Create a malformed command error
    pub fn malformed_command(message: impl Into<String>) -> Self {
        Self::MalformedCommand(message.into())
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Create a command failed error
    pub fn command_failed(
        code: i32,
        code_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::CommandFailed { code, code_name: code_name.into(), message: message.into() }
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an engine-specific error
    pub fn engine_error(engine: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::EngineError { engine: engine.into(), detail: detail.into() }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}

/// Result type alias for connector operations
pub type Result<T> = std::result::Result<T, ConnectorError>;
