//! Mongo Connector - Stateless Command Adapter for MongoDB
//!
//! The connector lets a host application run arbitrary database commands against MongoDB,
//! normalizes the heterogeneous replies into a uniform execution result, and infers a
//! browsable structure (collections, field types, example commands) from live data.
//!
//! # Core Principles
//! - Stateless: every call works on a caller-supplied connection handle
//! - JSON in, JSON out: extended JSON wrappers are collapsed into plain values
//! - Deterministic: identical configuration yields a byte-identical connection URI
//! - Connection failures surface immediately; handles are never retried internally
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`config`] - Datasource configuration, URI construction, validation
//! - [`extjson`] - Command parsing and reply normalization
//! - [`engine`] - Document store trait and the MongoDB implementation
//! - [`execute`] - Command execution and reply interpretation
//! - [`structure`] - Structure inference and command templates
//! - [`probe`] - Connectivity test
//! - [`output`] - JSON output envelope types
//! - [`logging`] - stderr diagnostics

pub mod config;
pub mod engine;
pub mod error;
pub mod execute;
pub mod extjson;
pub mod logging;
pub mod output;
pub mod probe;
pub mod structure;

pub use config::{
    build_client_uri, resolve_datasource, validate_datasource, AuthType, Authentication,
    ConnectionMode, DatasourceConfig, DatasourceRegistry, Endpoint,
};
pub use engine::{datasource_create, datasource_destroy, DocumentStore};
pub use error::{ConnectorError, Result};
pub use execute::{execute, ExecutionResult};
pub use extjson::{normalize, parse_command};
pub use output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use probe::{test_datasource, DatasourceTestResult};
pub use structure::{infer_structure, Column, DatasourceStructure, FieldType, Table, Template};

#[cfg(feature = "mongodb")]
pub use engine::mongo::MongoStore;
