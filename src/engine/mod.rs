//! Document Store Trait and Connection Lifecycle
//!
//! This module defines the seam between the connector's logic and the database driver.
//! The MongoDB implementation lives in [`mongo`]; tests supply an in-memory store.
//!
//! # Connection Lifecycle
//! - [`datasource_create`] opens a handle from a [`DatasourceConfig`]
//! - Operations borrow the handle (`&S`) and never close it
//! - [`datasource_destroy`] consumes the handle; passing `None` is a no-op
//!
//! Operations take `Option<&S>` so an absent handle can be reported as a
//! connection failure instead of a panic.
//!
//! # Error Mapping
//! Implementations translate driver errors before returning them:
//! - server selection or I/O timeouts → `Timeout`
//! - other I/O and pool failures → `ConnectionFailed`
//! - command error named `Unauthorized` → `AuthorizationAmbiguous`
//! - other command errors → `CommandFailed`
//! - BSON encode/decode failures → `Serialization`
//! - invalid URI or options → `ConfigError`

use bson::Document;
use std::future::Future;
use tracing::{debug, info};

use crate::config::DatasourceConfig;
use crate::error::Result;

#[cfg(feature = "mongodb")]
pub mod mongo;

/// Engine name reported in output envelopes
pub const ENGINE_NAME: &str = "mongodb";

/// Minimal database surface used by execution, introspection and probing
///
/// A handle is shared by reference across operations and released with [`close`](Self::close).
pub trait DocumentStore: Sized + Send + Sync {
    /// Open a client for the datasource
    ///
    /// Building the client performs no network round trip unless the URI needs
    /// DNS resolution (SRV).
    fn create(config: &DatasourceConfig) -> impl Future<Output = Result<Self>> + Send;

    /// Release the client and its connection pool
    fn close(self) -> impl Future<Output = ()> + Send;

    /// Run a database command and return the raw reply
    fn run_command(
        &self,
        database: &str,
        command: Document,
    ) -> impl Future<Output = Result<Document>> + Send;

    /// Names of all collections in a database
    fn list_collection_names(
        &self,
        database: &str,
    ) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// First document of a collection in natural order, if any
    fn find_one(
        &self,
        database: &str,
        collection: &str,
    ) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Start and immediately end a client session
    ///
    /// Forces server selection against a replica set.
    fn start_session(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Open a connection handle for a datasource
pub async fn datasource_create<S: DocumentStore>(config: &DatasourceConfig) -> Result<S> {
    debug!(endpoints = config.endpoints.len(), mode = ?config.connection.mode, "Creating datasource");
    let store = S::create(config).await?;
    info!("Datasource created");
    Ok(store)
}

/// Close a connection handle; `None` does nothing
pub async fn datasource_destroy<S: DocumentStore>(store: Option<S>) {
    if let Some(store) = store {
        store.close().await;
        info!("Datasource closed");
    }
}
