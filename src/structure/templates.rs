//! Example command templates for a collection
//!
//! Five fixed templates are produced per collection: Find, Find by ID, Insert,
//! Update and Delete. The text is shell syntax (constructor calls allowed) and
//! round-trips through `extjson::parse_command`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field set by the Update template when the sample has no string field
pub const UPDATE_PLACEHOLDER_FIELD: &str = "field_to_update";

/// A titled example command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub title: String,
    pub command_text: String,
}

impl Template {
    fn new(title: &str, command_text: String) -> Self {
        Self { title: title.to_string(), command_text }
    }
}

/// Field and sampled value used to filter the Find template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter<'a> {
    pub field: &'a str,
    pub value: &'a str,
}

/// Build the five templates for `collection`
///
/// `insert_values` holds `(field, literal)` pairs; they are written sorted by field.
#[must_use]
pub fn for_collection(
    collection: &str,
    filter: Option<Filter<'_>>,
    insert_values: &[(String, &str)],
) -> Vec<Template> {
    let collection = quote(collection);

    vec![
        Template::new("Find", find(&collection, filter)),
        Template::new("Find by ID", find_by_id(&collection)),
        Template::new("Insert", insert(&collection, insert_values)),
        Template::new("Update", update(&collection, filter)),
        Template::new("Delete", delete(&collection)),
    ]
}

fn find(collection: &str, filter: Option<Filter<'_>>) -> String {
    let filter_clause = filter.map_or_else(String::new, |Filter { field, value }| {
        format!("  \"filter\": {{\n    {}: {}\n  }},\n", quote(field), quote(value))
    });

    format!(
        "{{\n  \"find\": {collection},\n{filter_clause}  \"sort\": {{\n    \"_id\": 1\n  }},\n  \"limit\": 10\n}}\n"
    )
}

fn find_by_id(collection: &str) -> String {
    format!(
        "{{\n  \"find\": {collection},\n  \"filter\": {{\n    \"_id\": ObjectId(\"id_to_query_with\")\n  }}\n}}\n"
    )
}

fn insert(collection: &str, insert_values: &[(String, &str)]) -> String {
    let mut entries: Vec<&(String, &str)> = insert_values.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut document = String::new();
    if !entries.is_empty() {
        let lines: Vec<String> = entries
            .iter()
            .map(|(field, literal)| format!("      {}: {literal}", quote(field)))
            .collect();
        document.push_str(&lines.join(",\n"));
        document.push('\n');
    }

    format!(
        "{{\n  \"insert\": {collection},\n  \"documents\": [\n    {{\n{document}    }}\n  ]\n}}\n"
    )
}

fn update(collection: &str, filter: Option<Filter<'_>>) -> String {
    let field = quote(filter.map_or(UPDATE_PLACEHOLDER_FIELD, |f| f.field));

    format!(
        "{{\n  \"update\": {collection},\n  \"updates\": [\n    {{\n      \"q\": {{\n        \"_id\": ObjectId(\"id_of_document_to_update\")\n      }},\n      \"u\": {{ \"$set\": {{ {field}: \"new value\" }} }}\n    }}\n  ]\n}}\n"
    )
}

fn delete(collection: &str) -> String {
    format!(
        "{{\n  \"delete\": {collection},\n  \"deletes\": [\n    {{\n      \"q\": {{\n        \"_id\": \"id_of_document_to_delete\"\n      }},\n      \"limit\": 1\n    }}\n  ]\n}}\n"
    )
}

/// JSON string literal, quotes included
fn quote(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}
