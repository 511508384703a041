//! Structure Inference
//!
//! Builds a browsable listing of a database: one table per collection, with columns
//! inferred from a single sampled document and five example command templates.
//!
//! # Algorithm
//! For each collection (sequentially):
//! 1. Fetch one document; collections without documents are listed with no columns
//!    and no templates
//! 2. Classify every field into a [`FieldType`]
//! 3. Collect an example insert literal per field (`_id` object ids are skipped)
//! 4. Pick the lexicographically smallest string field as the Find filter
//! 5. Generate the templates
//!
//! Columns are sorted by name within each table; tables are sorted by name.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::DocumentStore;
use crate::error::{ConnectorError, Result};

pub mod templates;

pub use templates::{Filter, Template, UPDATE_PLACEHOLDER_FIELD};

/// Identity field every document carries
pub const ID_FIELD: &str = "_id";

/// Inferred type of a sampled field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Integer,
    Long,
    Double,
    BigDecimal,
    String,
    ObjectId,
    Array,
    Date,
    /// Embedded documents and every other BSON type
    Object,
}

impl FieldType {
    /// Classify a BSON value
    #[must_use]
    pub const fn of(value: &Bson) -> Self {
        match value {
            Bson::Int32(_) => Self::Integer,
            Bson::Int64(_) => Self::Long,
            Bson::Double(_) => Self::Double,
            Bson::Decimal128(_) => Self::BigDecimal,
            Bson::String(_) => Self::String,
            Bson::ObjectId(_) => Self::ObjectId,
            Bson::Array(_) => Self::Array,
            Bson::DateTime(_) => Self::Date,
            _ => Self::Object,
        }
    }

    /// Example literal for an Insert template
    #[must_use]
    pub const fn sample_literal(&self) -> &'static str {
        match self {
            Self::Integer | Self::Double => "1",
            Self::Long => "NumberLong(\"1\")",
            Self::BigDecimal => "NumberDecimal(\"1\")",
            Self::String => "\"new value\"",
            Self::ObjectId => "ObjectId(\"a_valid_object_id_hex\")",
            Self::Array => "[1, 2, 3]",
            Self::Date => "new Date(\"2019-07-01\")",
            Self::Object => "{}",
        }
    }
}

/// Kind of a listed table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    #[default]
    Collection,
}

/// Inferred column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Unknown from a single sample
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
}

/// One collection in the listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    pub templates: Vec<Template>,
}

impl Table {
    /// Listing entry for a collection with no sampled document
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self { name: name.into(), kind: TableKind::Collection, columns: Vec::new(), templates: Vec::new() }
    }
}

/// Inferred structure of a database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasourceStructure {
    pub tables: Vec<Table>,
}

/// Infer the structure of `database`
///
/// A missing handle fails with `ConnectionFailed`. A collection whose sample cannot
/// be read for lack of privilege (or another command error) is listed empty;
/// connection failures and timeouts abort the whole listing.
pub async fn infer_structure<S: DocumentStore>(
    store: Option<&S>,
    database: &str,
) -> Result<DatasourceStructure> {
    let Some(store) = store else {
        return Err(ConnectorError::connection_failed(
            "Connection handle is missing or stale; acquire a new connection",
        ));
    };

    let names = store.list_collection_names(database).await?;
    let mut tables = Vec::with_capacity(names.len());

    for name in names {
        let table = match store.find_one(database, &name).await {
            Ok(Some(sample)) => describe_collection(&name, &sample),
            Ok(None) => {
                debug!(collection = %name, "Collection is empty, no columns inferred");
                Table::empty(name)
            }
            Err(e @ (ConnectorError::AuthorizationAmbiguous(_) | ConnectorError::CommandFailed { .. })) => {
                warn!(collection = %name, error = %e, "Could not sample collection");
                Table::empty(name)
            }
            Err(e) => return Err(e),
        };
        tables.push(table);
    }

    tables.sort_by(|a, b| a.name.cmp(&b.name));
    debug!(database, collections = tables.len(), "Structure inferred");

    Ok(DatasourceStructure { tables })
}

/// Describe a collection from one sampled document
#[must_use]
pub fn describe_collection(name: &str, sample: &Document) -> Table {
    let mut columns = Vec::with_capacity(sample.len());
    let mut insert_values: Vec<(String, &'static str)> = Vec::with_capacity(sample.len());
    let mut filter: Option<Filter<'_>> = None;

    for (field, value) in sample {
        let field_type = FieldType::of(value);

        if !(field_type == FieldType::ObjectId && field == ID_FIELD) {
            insert_values.push((field.clone(), field_type.sample_literal()));
        }

        if let Bson::String(text) = value {
            if filter.map_or(true, |current| field.as_str() < current.field) {
                filter = Some(Filter { field, value: text });
            }
        }

        columns.push(Column { name: field.clone(), field_type, nullable: None });
    }

    columns.sort_by(|a, b| a.name.cmp(&b.name));
    let templates = templates::for_collection(name, filter, &insert_values);

    Table { name: name.to_string(), kind: TableKind::Collection, columns, templates }
}
