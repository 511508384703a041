//! MongoDB Document Store Implementation
//!
//! This module implements the `DocumentStore` trait on top of the official `mongodb` driver.
//!
//! # Features
//! - Direct, multi-host and `mongodb+srv://` connections (URI built by `config::uri`)
//! - Raw command execution against any database
//! - Collection listing and single-document sampling for introspection
//! - Session start for replica-set probing
//!
//! # Implementation Notes
//! - The driver manages its own connection pool; one `MongoStore` is one `Client`
//! - Driver calls are bounded by `timeoutMs` via `tokio::time::timeout` when configured
//! - Without `timeoutMs`, the driver's server selection timeout (30s) applies
//! - Credentials never appear in log output or error messages
//! - Username and password are taken from the config, not decoded from the URI: the URI
//!   form-encodes a space as `+`, which the driver would read back literally

use bson::{doc, Document};
use mongodb::error::{Error as DriverError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::Client;
use std::future::{Future, IntoFuture};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{build_client_uri, DatasourceConfig};
use crate::engine::{DocumentStore, ENGINE_NAME};
use crate::error::{ConnectorError, Result};

/// Code name the server reports for privilege failures
const UNAUTHORIZED: &str = "Unauthorized";

/// MongoDB connection handle
#[derive(Debug, Clone)]
pub struct MongoStore {
    client: Client,
    timeout: Option<Duration>,
}

impl MongoStore {
    /// Await a driver operation, bounded by the configured timeout
    async fn bounded<T, F>(&self, operation: &str, future: F) -> Result<T>
    where
        F: Future<Output = mongodb::error::Result<T>> + Send,
    {
        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, future).await.map_err(|_| {
                warn!(operation, timeout_ms = limit.as_millis() as u64, "Operation timed out");
                ConnectorError::timeout(format!(
                    "{operation} exceeded timeout of {}ms",
                    limit.as_millis()
                ))
            })?,
            None => future.await,
        };

        outcome.map_err(classify_error)
    }
}

impl DocumentStore for MongoStore {
    async fn create(config: &DatasourceConfig) -> Result<Self> {
        let options = client_options(config).await?;
        let client = Client::with_options(options).map_err(invalid_options)?;

        debug!(srv = config.is_srv(), hosts = config.endpoints.len(), "MongoDB client created");

        Ok(Self { client, timeout: config.timeout() })
    }

    async fn close(self) {
        self.client.shutdown().await;
    }

    async fn run_command(&self, database: &str, command: Document) -> Result<Document> {
        let db = self.client.database(database);
        self.bounded("runCommand", db.run_command(command).into_future()).await
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
        let db = self.client.database(database);
        self.bounded("listCollections", db.list_collection_names().into_future()).await
    }

    async fn find_one(&self, database: &str, collection: &str) -> Result<Option<Document>> {
        let collection = self.client.database(database).collection::<Document>(collection);
        self.bounded("find", collection.find_one(doc! {}).into_future()).await
    }

    async fn start_session(&self) -> Result<()> {
        // The session ends when dropped
        self.bounded("startSession", self.client.start_session().into_future()).await.map(|_| ())
    }
}

/// Driver options for `config`, with credentials restored from their raw values
async fn client_options(config: &DatasourceConfig) -> Result<ClientOptions> {
    let uri = build_client_uri(config);
    let mut options = ClientOptions::parse(uri).await.map_err(invalid_options)?;

    if let (Some(auth), Some(credential)) = (&config.authentication, options.credential.as_mut()) {
        if let Some(username) = &auth.username {
            credential.username = Some(username.clone());
        }
        if let Some(password) = &auth.password {
            credential.password = Some(password.clone());
        }
    }

    Ok(options)
}

fn invalid_options(err: DriverError) -> ConnectorError {
    match classify_error(err) {
        ConnectorError::EngineError { detail, .. } => {
            ConnectorError::config_error(format!("Invalid connection options: {detail}"))
        }
        other => other,
    }
}

/// Translate a driver error into the connector's error categories
fn classify_error(err: DriverError) -> ConnectorError {
    match err.kind.as_ref() {
        ErrorKind::Command(command) if command.code_name == UNAUTHORIZED => {
            ConnectorError::authorization_ambiguous(command.message.clone())
        }
        ErrorKind::Command(command) => ConnectorError::command_failed(
            command.code,
            command.code_name.clone(),
            command.message.clone(),
        ),
        ErrorKind::ServerSelection { message, .. } => {
            ConnectorError::timeout(format!("Server selection failed: {message}"))
        }
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            ConnectorError::timeout(io.to_string())
        }
        ErrorKind::Io(io) => ConnectorError::connection_failed(io.to_string()),
        ErrorKind::ConnectionPoolCleared { message, .. } => {
            ConnectorError::connection_failed(message.clone())
        }
        ErrorKind::DnsResolve { message, .. } => {
            ConnectorError::connection_failed(format!("DNS resolution failed: {message}"))
        }
        ErrorKind::Authentication { message, .. } => {
            ConnectorError::connection_failed(format!("Authentication failed: {message}"))
        }
        ErrorKind::InvalidArgument { message, .. } => ConnectorError::config_error(message.clone()),
        ErrorKind::BsonDeserialization(e) => ConnectorError::serialization(e.to_string()),
        ErrorKind::BsonSerialization(e) => ConnectorError::serialization(e.to_string()),
        _ => ConnectorError::engine_error(ENGINE_NAME, err.to_string()),
    }
}
