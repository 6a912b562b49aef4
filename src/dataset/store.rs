use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::DatasetSchema;

/// In-memory registry of the sample datasets found under the data directory.
///
/// Each dataset is described by a `schema.json` file in its own subdirectory.
/// Malformed files are skipped with a warning; an empty registry is a valid
/// (if unhelpful) state.
pub struct DatasetStore {
    datasets: Vec<DatasetSchema>,
}

impl DatasetStore {
    pub fn load(data_dir: &Path) -> Self {
        let mut datasets = Vec::new();

        if !data_dir.exists() {
            tracing::warn!(dir = %data_dir.display(), "Dataset directory does not exist");
            return Self { datasets };
        }

        for schema_file in find_schema_files(data_dir) {
            match read_schema(&schema_file) {
                Ok(schema) => {
                    tracing::info!(
                        dataset = %schema.dataset_name,
                        domain = %schema.domain,
                        "Loaded dataset schema"
                    );
                    datasets.push(schema);
                }
                Err(e) => {
                    tracing::warn!(
                        file = %schema_file.display(),
                        error = %e,
                        "Skipping malformed dataset schema"
                    );
                }
            }
        }

        Self { datasets }
    }

    #[cfg(test)]
    pub fn from_schemas(datasets: Vec<DatasetSchema>) -> Self {
        Self { datasets }
    }

    pub fn get(&self, dataset_name: &str) -> Option<&DatasetSchema> {
        self.datasets.iter().find(|d| d.dataset_name == dataset_name)
    }

    pub fn find_by_domain(&self, domain: &str) -> Option<&DatasetSchema> {
        self.datasets
            .iter()
            .find(|d| d.domain.eq_ignore_ascii_case(domain))
    }

    /// Find a dataset referenced in free text (e.g. "the telecom dataset").
    ///
    /// Matching is case-insensitive, first match wins: domain substring, then
    /// dataset name with underscores read as spaces, then a small alias table.
    /// No match is a legitimate "proceed without dataset context" outcome.
    pub fn find_by_reference(&self, text: &str) -> Option<&DatasetSchema> {
        let text_lower = text.to_lowercase();

        for dataset in &self.datasets {
            if text_lower.contains(&dataset.domain.to_lowercase()) {
                return Some(dataset);
            }
            let spaced_name = dataset.dataset_name.to_lowercase().replace('_', " ");
            if text_lower.contains(&spaced_name) {
                return Some(dataset);
            }
        }

        // Common aliases for the bundled domains
        if text_lower.contains("customer") {
            return self.find_by_domain("telecom");
        }
        if text_lower.contains("patient") || text_lower.contains("medical") {
            return self.find_by_domain("healthcare");
        }

        None
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.datasets.iter().map(|d| d.dataset_name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

fn find_schema_files(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        let entries = match fs::read_dir(&current) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %current.display(), error = %e, "Failed to read directory");
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.file_name().is_some_and(|n| n == "schema.json") {
                found.push(path);
            }
        }
    }

    found.sort();
    found
}

fn read_schema(path: &Path) -> crate::error::Result<DatasetSchema> {
    let contents = fs::read_to_string(path)?;
    let schema = serde_json::from_str(&contents)?;
    Ok(schema)
}

/// Human-readable schema summary for CLI output and PR bodies.
pub fn schema_description(dataset: &DatasetSchema) -> String {
    let mut lines = vec![
        format!("Dataset: {}", dataset.dataset_name),
        format!("Domain: {}", dataset.domain),
        format!("Description: {}", dataset.description),
        format!("File: {}", dataset.file_path),
        String::new(),
        "Schema Fields:".to_string(),
    ];

    for (field_name, field) in &dataset.fields {
        let mut desc = format!("  - {} ({})", field_name, field.field_type);
        if field.primary_key {
            desc.push_str(" [PRIMARY KEY]");
        }
        if !field.nullable {
            desc.push_str(" [NOT NULL]");
        }
        if let Some(values) = &field.enum_values {
            desc.push_str(&format!(" [Values: {}]", values.join(", ")));
        }
        desc.push_str(&format!(": {}", field.description));
        lines.push(desc);
    }

    if let Some(queries) = &dataset.sample_queries {
        lines.push(String::new());
        lines.push("Sample Queries:".to_string());
        for query in queries {
            lines.push(format!("  - {query}"));
        }
    }

    lines.join("\n")
}

/// Schema context formatted as JSON for embedding in generation prompts.
pub fn schema_for_prompt(dataset: &DatasetSchema) -> String {
    let mut fields = serde_json::Map::new();
    for (field_name, field) in &dataset.fields {
        let mut info = serde_json::Map::new();
        info.insert("type".into(), field.field_type.clone().into());
        info.insert("description".into(), field.description.clone().into());
        info.insert("nullable".into(), field.nullable.into());
        info.insert("primary_key".into(), field.primary_key.into());
        if let Some(values) = &field.enum_values {
            info.insert("enum".into(), values.clone().into());
        }
        if let Some(format) = &field.format {
            info.insert("format".into(), format.clone().into());
        }
        fields.insert(field_name.clone(), info.into());
    }

    let info = serde_json::json!({
        "dataset_name": dataset.dataset_name,
        "domain": dataset.domain,
        "description": dataset.description,
        "file_path": dataset.file_path,
        "fields": fields,
    });

    serde_json::to_string_pretty(&info).unwrap_or_else(|_| "{}".to_string())
}
