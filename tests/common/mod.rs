//! In-memory document store for tests
//!
//! Replies, collections and failures are scripted up front; every command the
//! store receives is recorded for later assertions.

#![allow(dead_code)]

use bson::Document;
use mongo_connector::{ConnectorError, DatasourceConfig, DocumentStore, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Host that makes `FakeStore::create` fail
pub const UNREACHABLE_HOST: &str = "unreachable.invalid";

/// Host that makes `FakeStore::create` time out
pub const SLOW_HOST: &str = "slow.invalid";

/// Failure a scripted call returns
#[derive(Debug, Clone)]
pub enum Failure {
    Timeout,
    ConnectionLost,
    Unauthorized,
    Command { code: i32, code_name: &'static str, message: &'static str },
    Engine(&'static str),
}

impl Failure {
    fn to_error(&self) -> ConnectorError {
        match self {
            Self::Timeout => ConnectorError::timeout("server selection timed out"),
            Self::ConnectionLost => ConnectorError::connection_failed("connection reset by peer"),
            Self::Unauthorized => ConnectorError::authorization_ambiguous("not authorized on admin"),
            Self::Command { code, code_name, message } => {
                ConnectorError::command_failed(*code, *code_name, *message)
            }
            Self::Engine(detail) => ConnectorError::engine_error("mongodb", *detail),
        }
    }
}

/// Commands received by a store, shared so they outlive it
pub type CommandLog = Arc<Mutex<Vec<(String, Document)>>>;

#[derive(Debug, Default)]
pub struct FakeStore {
    reply: Option<Document>,
    command_failure: Option<Failure>,
    session_failure: Option<Failure>,
    list_failure: Option<Failure>,
    collections: Vec<(String, Option<Document>)>,
    sample_failures: Vec<(String, Failure)>,
    commands: CommandLog,
    closed: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply returned by every `run_command`
    pub fn with_reply(mut self, reply: Document) -> Self {
        self.reply = Some(reply);
        self
    }

    pub fn with_command_failure(mut self, failure: Failure) -> Self {
        self.command_failure = Some(failure);
        self
    }

    pub fn with_session_failure(mut self, failure: Failure) -> Self {
        self.session_failure = Some(failure);
        self
    }

    pub fn with_list_failure(mut self, failure: Failure) -> Self {
        self.list_failure = Some(failure);
        self
    }

    /// Add a collection; `None` means it holds no documents
    pub fn with_collection(mut self, name: &str, sample: Option<Document>) -> Self {
        self.collections.push((name.to_string(), sample));
        self
    }

    pub fn with_sample_failure(mut self, name: &str, failure: Failure) -> Self {
        self.collections.push((name.to_string(), None));
        self.sample_failures.push((name.to_string(), failure));
        self
    }

    /// Counter incremented by `close`
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closed)
    }

    pub fn command_log(&self) -> CommandLog {
        Arc::clone(&self.commands)
    }

    /// Commands received so far, with their target database
    pub fn commands(&self) -> Vec<(String, Document)> {
        self.commands.lock().map(|commands| commands.clone()).unwrap_or_default()
    }
}

impl DocumentStore for FakeStore {
    async fn create(config: &DatasourceConfig) -> Result<Self> {
        if config.endpoints.iter().any(|endpoint| endpoint.host == UNREACHABLE_HOST) {
            return Err(ConnectorError::connection_failed("DNS resolution failed"));
        }
        if config.endpoints.iter().any(|endpoint| endpoint.host == SLOW_HOST) {
            return Err(ConnectorError::timeout("SRV lookup timed out"));
        }
        Ok(Self::new().with_reply(bson::doc! { "ok": 1.0 }))
    }

    async fn close(self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    async fn run_command(&self, database: &str, command: Document) -> Result<Document> {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push((database.to_string(), command));
        }

        if let Some(failure) = &self.command_failure {
            return Err(failure.to_error());
        }
        Ok(self.reply.clone().unwrap_or_else(|| bson::doc! { "ok": 1.0 }))
    }

    async fn list_collection_names(&self, _database: &str) -> Result<Vec<String>> {
        if let Some(failure) = &self.list_failure {
            return Err(failure.to_error());
        }
        Ok(self.collections.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn find_one(&self, _database: &str, collection: &str) -> Result<Option<Document>> {
        if let Some((_, failure)) = self.sample_failures.iter().find(|(name, _)| name == collection) {
            return Err(failure.to_error());
        }
        Ok(self
            .collections
            .iter()
            .find(|(name, _)| name == collection)
            .and_then(|(_, sample)| sample.clone()))
    }

    async fn start_session(&self) -> Result<()> {
        match &self.session_failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }
}
