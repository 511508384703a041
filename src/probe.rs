//! Connectivity Probe
//!
//! Opens a short-lived handle, performs one round trip and closes the handle again.
//!
//! # Probe Per Mode
//! - `REPLICA_SET`: start a client session (forces server selection)
//! - `DIRECT`: run `{listDatabases: 1}` on `admin`
//!
//! An `Unauthorized` reply counts as success: the server answered and accepted
//! the credentials, the user just lacks the privilege. The handle is closed on
//! every path before the result is returned.

use bson::doc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ConnectionMode, DatasourceConfig};
use crate::engine::DocumentStore;
use crate::error::{ConnectorError, Result};

/// Reported when the probe times out
pub const TIMEOUT_MESSAGE: &str = "Timed out trying to connect to MongoDB host.";

/// Outcome of a connectivity test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceTestResult {
    /// Failure messages; empty on success
    pub invalids: Vec<String>,
}

impl DatasourceTestResult {
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self { invalids: vec![message.into()] }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.invalids.is_empty()
    }
}

/// Open a handle for `config`, probe it and close it
///
/// Failures to open the handle are reported like failures of the probe itself.
pub async fn test_datasource<S: DocumentStore>(config: &DatasourceConfig) -> DatasourceTestResult {
    match S::create(config).await {
        Ok(store) => test_store(store, config.connection.mode).await,
        Err(e) => {
            warn!(error_code = e.error_code(), "Could not create client for connectivity test");
            report(Err(e))
        }
    }
}

/// Probe an already opened handle and close it
pub async fn test_store<S: DocumentStore>(store: S, mode: ConnectionMode) -> DatasourceTestResult {
    let outcome = probe(&store, mode).await;
    store.close().await;

    debug!(?mode, passed = outcome.is_ok(), "Connectivity test finished");
    report(outcome)
}

fn report(outcome: Result<()>) -> DatasourceTestResult {
    match outcome {
        Ok(()) => DatasourceTestResult::success(),
        Err(ConnectorError::AuthorizationAmbiguous(message)) => {
            debug!(%message, "Unauthorized reply, server reachable");
            DatasourceTestResult::success()
        }
        Err(ConnectorError::Timeout(_)) => {
            warn!("Timeout connecting to MongoDB host");
            DatasourceTestResult::failure(TIMEOUT_MESSAGE)
        }
        Err(e) => {
            warn!(error_code = e.error_code(), "Connectivity test failed");
            DatasourceTestResult::failure(e.message())
        }
    }
}

async fn probe<S: DocumentStore>(store: &S, mode: ConnectionMode) -> Result<()> {
    match mode {
        ConnectionMode::ReplicaSet => store.start_session().await,
        ConnectionMode::Direct => {
            store.run_command("admin", doc! { "listDatabases": 1 }).await.map(|_| ())
        }
    }
}
