//! Mongo Connector CLI Entry Point
//!
//! Subcommands:
//! - `uri` - Print the connection URI built from the datasource
//! - `validate` - List datasource validation failures
//! - `test` - Validate, then probe connectivity
//! - `query` - Execute a command body
//! - `structure` - Infer collections, columns and templates
//!
//! All output to stdout is a single JSON envelope. Logs go to stderr.

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use mongo_connector::{
    build_client_uri, datasource_create, datasource_destroy, execute, infer_structure, logging,
    resolve_datasource, test_datasource, validate_datasource, ConnectorError, DatasourceConfig,
    DatasourceTestResult, ErrorEnvelope, Metadata, MongoStore, Result, SuccessEnvelope,
};

/// Mongo Connector - run commands and infer structure against MongoDB
#[derive(Parser)]
#[command(name = "mongo-connector")]
#[command(about = "Stateless MongoDB command adapter with JSON output")]
#[command(version)]
struct Cli {
    /// Datasource config file (default: local, then global config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Datasource name (default: the registry's default)
    #[arg(long, global = true)]
    name: Option<String>,

    /// Debug logging on stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the connection URI
    Uri,

    /// List validation failures
    Validate,

    /// Validate the datasource, then test connectivity
    Test,

    /// Execute a command body
    Query {
        /// Command body as JSON (shell constructors accepted)
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        command: Option<String>,

        /// Read the command body from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Target database (default: the datasource's database)
        #[arg(long)]
        database: Option<String>,
    },

    /// Infer the structure of a database
    Structure {
        /// Target database (default: the datasource's database)
        #[arg(long)]
        database: Option<String>,
    },
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Uri => "uri",
            Self::Validate => "validate",
            Self::Test => "test",
            Self::Query { .. } => "query",
            Self::Structure { .. } => "structure",
        }
    }
}

/// Payload of a successful run and its document count, if any
type Outcome = (Value, Option<usize>);

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let command = cli.command.name();
    let started = Instant::now();

    match run(&cli).await {
        Ok((data, documents)) => {
            let meta = Metadata::since(started).with_documents(documents);
            print_json(&SuccessEnvelope::new(command, data, meta));
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_json(&ErrorEnvelope::from_error(command, &e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<Outcome> {
    let config = resolve_datasource(cli.config.as_deref(), cli.name.as_deref())?;

    match &cli.command {
        Commands::Uri => Ok((Value::String(build_client_uri(&config)), None)),

        Commands::Validate => {
            let invalids = validate_datasource(&config);
            Ok((json!({ "valid": invalids.is_empty(), "invalids": invalids }), None))
        }

        Commands::Test => {
            let invalids = validate_datasource(&config);
            let result = if invalids.is_empty() {
                test_datasource::<MongoStore>(&config).await
            } else {
                DatasourceTestResult { invalids }
            };
            Ok((to_value(&result)?, None))
        }

        Commands::Query { command, file, database } => {
            let body = match (command, file) {
                (Some(body), _) => body.clone(),
                (None, Some(path)) => read_command_file(path)?,
                (None, None) => {
                    return Err(ConnectorError::invalid_input("Provide --command or --file"));
                }
            };
            let database = target_database(&config, database.as_deref())?;

            let store = datasource_create::<MongoStore>(&config).await?;
            let result = execute(Some(&store), &database, &body).await;
            datasource_destroy(Some(store)).await;

            let result = result?;
            Ok((to_value(&result)?, result.documents_returned()))
        }

        Commands::Structure { database } => {
            let database = target_database(&config, database.as_deref())?;

            let store = datasource_create::<MongoStore>(&config).await?;
            let structure = infer_structure(Some(&store), &database).await;
            datasource_destroy(Some(store)).await;

            Ok((to_value(&structure?)?, None))
        }
    }
}

fn target_database(config: &DatasourceConfig, explicit: Option<&str>) -> Result<String> {
    let database = explicit.unwrap_or_else(|| config.database_name());
    if database.is_empty() {
        return Err(ConnectorError::invalid_input(
            "No database given. Pass --database or set a default database name",
        ));
    }
    Ok(database.to_string())
}

fn read_command_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ConnectorError::invalid_input(format!("Could not read '{}': {e}", path.display()))
    })
}

fn to_value<T: Serialize>(data: &T) -> Result<Value> {
    serde_json::to_value(data).map_err(|e| ConnectorError::serialization(e.to_string()))
}

fn print_json<T: Serialize>(envelope: &T) {
    match serde_json::to_string(envelope) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize output: {e}"),
    }
}
