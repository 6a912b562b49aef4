pub mod store;

pub use store::DatasetStore;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schema definition for a single field of a dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

fn default_nullable() -> bool {
    true
}

/// Metadata describing a known sample dataset: where it lives and what it
/// contains. Loaded once at startup and immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub dataset_name: String,
    pub domain: String,
    pub description: String,
    pub file_path: String,
    #[serde(rename = "schema")]
    pub fields: BTreeMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_queries: Option<Vec<String>>,
}
