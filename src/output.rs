//! JSON Output Envelope Types
//!
//! Every CLI invocation prints exactly one envelope to stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "engine": "mongodb", "command": "...", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "engine": "mongodb", "command": "...", "error": {"code": "...", "message": "..."}}`
//!
//! A command the database rejected is still a success envelope: the failure is
//! carried inside `data` as an execution result with `success: false`.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::engine::ENGINE_NAME;
use crate::error::ConnectorError;

/// Success envelope, generic over the payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    pub engine: String,

    /// Subcommand that produced the payload (uri, validate, test, query, structure)
    pub command: String,

    pub data: T,

    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, engine: ENGINE_NAME.to_string(), command: command.into(), data, meta }
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    pub engine: String,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, engine: ENGINE_NAME.to_string(), command: command.into(), error }
    }

    /// Create error envelope from a `ConnectorError`
    pub fn from_error(command: impl Into<String>, err: &ConnectorError) -> Self {
        Self::new(command, ErrorInfo::new(err.error_code(), err.message()))
    }
}

/// Error information structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "TIMEOUT", "CONNECTION_FAILED")
    pub code: String,

    /// Human-readable message; never contains credentials
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into() }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Wall time in milliseconds
    pub execution_ms: u64,

    /// Documents in a cursor result, None for other payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_returned: Option<usize>,
}

impl Metadata {
    #[must_use]
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, documents_returned: None }
    }

    /// Metadata with elapsed time measured from `started`
    #[must_use]
    pub fn since(started: Instant) -> Self {
        Self::new(u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX))
    }

    #[must_use]
    pub const fn with_documents(mut self, documents_returned: Option<usize>) -> Self {
        self.documents_returned = documents_returned;
        self
    }
}
