//! Datasource Configuration
//!
//! This module defines the structured datasource configuration and loads it from disk.
//!
//! # Configuration Locations
//! - Local: `.mongo-connector/datasources.json` (team-shareable, per-project)
//! - Global: `~/.config/mongo-connector/datasources.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Explicit `--config <file>` (highest priority)
//! 2. Local config file
//! 3. Global config file
//!
//! # Named Datasources
//! Datasources are stored as named entries (e.g., "local", "staging") with an optional
//! default pointer. A file holding a single bare datasource object is also accepted.
//!
//! Nothing is ever written back; the connector holds no state between calls.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConnectorError, Result};

pub mod uri;
pub mod validate;

pub use uri::{build_client_uri, DEFAULT_PORT};
pub use validate::validate_datasource;

/// Topology the client should connect with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionMode {
    /// Explicitly enumerated hosts
    #[default]
    Direct,
    /// Replica set; a single port-less endpoint selects SRV discovery
    ReplicaSet,
}

/// Authentication mechanisms a datasource may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthType {
    #[serde(rename = "SCRAM_SHA_1")]
    ScramSha1,
    #[serde(rename = "SCRAM_SHA_256")]
    ScramSha256,
    /// Deprecated in the driver, still accepted
    #[serde(rename = "MONGODB_CR")]
    MongodbCr,
    #[serde(rename = "MONGODB_X509")]
    MongodbX509,
    #[serde(rename = "PLAIN")]
    Plain,
    #[serde(rename = "GSSAPI")]
    Gssapi,
}

/// Mechanisms accepted by validation, in the order they are reported
pub const SUPPORTED_AUTH_TYPES: [AuthType; 3] =
    [AuthType::ScramSha1, AuthType::ScramSha256, AuthType::MongodbCr];

impl AuthType {
    /// Identifier as stored in configuration
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ScramSha1 => "SCRAM_SHA_1",
            Self::ScramSha256 => "SCRAM_SHA_256",
            Self::MongodbCr => "MONGODB_CR",
            Self::MongodbX509 => "MONGODB_X509",
            Self::Plain => "PLAIN",
            Self::Gssapi => "GSSAPI",
        }
    }

    /// Value of the `authMechanism` URI option
    #[must_use]
    pub fn mechanism(&self) -> String {
        self.as_str().replace('_', "-")
    }

    #[must_use]
    pub fn is_supported(&self) -> bool {
        SUPPORTED_AUTH_TYPES.contains(self)
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One host of the deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Endpoint {
    /// Endpoint without an explicit port
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into(), port: None }
    }

    /// Endpoint with an explicit port
    pub fn with_port(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port: Some(port) }
    }
}

/// TLS settings; presence of the block enables TLS unless `enabled` is false
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default = "default_tls_enabled")]
    pub enabled: bool,
}

fn default_tls_enabled() -> bool {
    true
}

/// Connection-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSettings {
    #[serde(default)]
    pub mode: ConnectionMode,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<TlsConfig>,

    /// Database commands run against; falls back to the authentication database
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database_name: Option<String>,

    /// Upper bound for every store operation, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Credentials and authentication database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for password (if not storing password directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<AuthType>,
}

impl Authentication {
    /// Username/password credentials checked against `database_name`
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        database_name: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            password_env: None,
            database_name: Some(database_name.into()),
            auth_type: None,
        }
    }

    #[must_use]
    pub fn with_auth_type(mut self, auth_type: AuthType) -> Self {
        self.auth_type = Some(auth_type);
        self
    }
}

/// Structured datasource configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceConfig {
    /// Hosts in connection order; at least one is required
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,

    #[serde(default)]
    pub connection: ConnectionSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

impl DatasourceConfig {
    /// Direct connection to the given hosts
    #[must_use]
    pub fn direct(endpoints: Vec<Endpoint>) -> Self {
        Self { endpoints, ..Default::default() }
    }

    /// Replica set connection to the given hosts
    #[must_use]
    pub fn replica_set(endpoints: Vec<Endpoint>) -> Self {
        let mut config = Self::direct(endpoints);
        config.connection.mode = ConnectionMode::ReplicaSet;
        config
    }

    #[must_use]
    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = Some(authentication);
        self
    }

    #[must_use]
    pub fn with_tls(mut self, enabled: bool) -> Self {
        self.connection.ssl = Some(TlsConfig { enabled });
        self
    }

    #[must_use]
    pub fn with_default_database(mut self, name: impl Into<String>) -> Self {
        self.connection.default_database_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connection.timeout_ms = Some(timeout_ms);
        self
    }

    /// Whether the URI uses DNS SRV discovery
    ///
    /// True for replica sets whose first endpoint carries no port.
    #[must_use]
    pub fn is_srv(&self) -> bool {
        self.connection.mode == ConnectionMode::ReplicaSet
            && self.endpoints.first().is_some_and(|endpoint| endpoint.port.is_none())
    }

    /// Database that commands and schema discovery run against
    ///
    /// The explicit default database wins; otherwise the authentication database is used.
    #[must_use]
    pub fn database_name(&self) -> &str {
        match self.connection.default_database_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => self
                .authentication
                .as_ref()
                .and_then(|auth| auth.database_name.as_deref())
                .unwrap_or_default(),
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.connection.timeout_ms.map(Duration::from_millis)
    }

    /// Resolve `passwordEnv` into the password field
    pub fn resolve_secrets(mut self) -> Result<Self> {
        if let Some(auth) = self.authentication.as_mut() {
            if let Some(env_var) = &auth.password_env {
                match std::env::var(env_var) {
                    Ok(password) => auth.password = Some(password),
                    Err(_) => {
                        return Err(ConnectorError::config_error(format!(
                            "Environment variable {env_var} not found for password"
                        )));
                    }
                }
            }
        }

        Ok(self)
    }
}

/// Named datasources as stored in a config file
///
/// Example:
/// ```json
/// {
///   "datasources": {
///     "local": { "endpoints": [{ "host": "localhost" }] },
///     "atlas": { "endpoints": [{ "host": "cluster0.example.net" }],
///                "connection": { "mode": "REPLICA_SET" } }
///   },
///   "default": "local"
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasourceRegistry {
    #[serde(default)]
    pub datasources: BTreeMap<String, DatasourceConfig>,

    /// Name of the default datasource (must exist in `datasources`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

/// Name given to a bare datasource file
const BARE_DATASOURCE_NAME: &str = "default";

/// Get path to local config file (`.mongo-connector/datasources.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        ConnectorError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".mongo-connector").join("datasources.json"))
}

/// Get path to global config file (`~/.config/mongo-connector/datasources.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConnectorError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("mongo-connector").join("datasources.json"))
}

/// Parse registry contents
///
/// Accepts the registry format and a bare datasource object (detected by its
/// top-level `endpoints` key).
pub fn parse_registry(contents: &str) -> Result<DatasourceRegistry> {
    let value: serde_json::Value = serde_json::from_str(contents)
        .map_err(|e| ConnectorError::config_error(format!("Invalid config file format: {e}")))?;

    let is_bare = value.as_object().is_some_and(|obj| obj.contains_key("endpoints"));

    if is_bare {
        let config = serde_json::from_value::<DatasourceConfig>(value).map_err(|e| {
            ConnectorError::config_error(format!("Invalid datasource format: {e}"))
        })?;

        let mut registry = DatasourceRegistry::default();
        registry.datasources.insert(BARE_DATASOURCE_NAME.to_string(), config);
        registry.default = Some(BARE_DATASOURCE_NAME.to_string());
        Ok(registry)
    } else {
        serde_json::from_value::<DatasourceRegistry>(value)
            .map_err(|e| ConnectorError::config_error(format!("Invalid registry format: {e}")))
    }
}

/// Load a registry from a config file
///
/// A missing file yields an empty registry.
pub fn load_registry(path: &Path) -> Result<DatasourceRegistry> {
    if !path.exists() {
        return Ok(DatasourceRegistry::default());
    }

    let contents = fs::read_to_string(path)
        .map_err(|e| ConnectorError::config_error(format!("Could not read config file: {e}")))?;

    parse_registry(&contents)
}

/// Overlay `local` on top of `global`
///
/// Datasources with the same name are replaced by the local entry and a local
/// default pointer overrides the global one.
#[must_use]
pub fn merge_registries(global: DatasourceRegistry, local: DatasourceRegistry) -> DatasourceRegistry {
    let mut merged = global;

    for (name, config) in local.datasources {
        merged.datasources.insert(name, config);
    }

    if local.default.is_some() {
        merged.default = local.default;
    }

    merged
}

/// Load the registry with precedence (local over global)
pub fn load_with_precedence() -> Result<DatasourceRegistry> {
    let local_path = local_config_path()?;
    let global_path = global_config_path()?;

    match (local_path.exists(), global_path.exists()) {
        (false, false) => Ok(DatasourceRegistry::default()),
        (true, false) => load_registry(&local_path),
        (false, true) => load_registry(&global_path),
        (true, true) => {
            let global = load_registry(&global_path)?;
            let local = load_registry(&local_path)?;
            Ok(merge_registries(global, local))
        }
    }
}

impl DatasourceRegistry {
    /// Pick a datasource by name, or the default one
    pub fn select(&self, name: Option<&str>) -> Result<&DatasourceConfig> {
        let available: Vec<_> = self.datasources.keys().collect();

        let name = match name {
            Some(n) => n,
            None => self.default.as_deref().ok_or_else(|| {
                ConnectorError::config_error(format!(
                    "No default datasource set. Available datasources: {available:?}. \
                     Specify one with --name or set a default in the config."
                ))
            })?,
        };

        self.datasources.get(name).ok_or_else(|| {
            ConnectorError::config_error(format!(
                "Datasource '{name}' not found. Available datasources: {available:?}"
            ))
        })
    }
}

/// Resolve the datasource to use
///
/// # Parameters
/// - `config_path`: Explicit config file. If None, local and global files are merged.
/// - `name`: Datasource name. If None, the registry's default is used.
pub fn resolve_datasource(
    config_path: Option<&Path>,
    name: Option<&str>,
) -> Result<DatasourceConfig> {
    let registry = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(ConnectorError::config_error(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            }
            load_registry(path)?
        }
        None => load_with_precedence()?,
    };

    if registry.datasources.is_empty() {
        return Err(ConnectorError::config_error(
            "No datasources configured. Pass --config or create .mongo-connector/datasources.json",
        ));
    }

    registry.select(name)?.clone().resolve_secrets()
}
