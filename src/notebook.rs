//! Notebook assembly: turning generated code blocks into ordered, portable
//! Jupyter documents (nbformat 4.4).
//!
//! Segmentation is textual and best-effort: setup extraction looks for import
//! statements and SparkSession initialization, test splitting looks for
//! `def test_` headers. When a heuristic finds nothing usable the whole block
//! is emitted as a single cell.

use serde::{Deserialize, Serialize};

use crate::dataset::{store, DatasetSchema};
use crate::error::Result;

const NBFORMAT: u32 = 4;
const NBFORMAT_MINOR: u32 = 4;

/// Setup is only split into its own cell when it is substantial.
const MIN_SETUP_LENGTH: usize = 50;
const MIN_MAIN_LENGTH: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "cell_type")]
pub enum Cell {
    #[serde(rename = "markdown")]
    Markdown {
        metadata: serde_json::Value,
        source: Vec<String>,
    },
    #[serde(rename = "code")]
    Code {
        metadata: serde_json::Value,
        source: Vec<String>,
        execution_count: Option<u32>,
        outputs: Vec<serde_json::Value>,
    },
}

impl Cell {
    pub fn markdown(text: &str) -> Self {
        Cell::Markdown {
            metadata: serde_json::json!({}),
            source: split_keepends(text),
        }
    }

    pub fn code(code: &str) -> Self {
        Cell::Code {
            metadata: serde_json::json!({}),
            source: split_keepends(code),
            execution_count: None,
            outputs: Vec::new(),
        }
    }

    pub fn source_text(&self) -> String {
        match self {
            Cell::Markdown { source, .. } | Cell::Code { source, .. } => source.concat(),
        }
    }

    pub fn is_code(&self) -> bool {
        matches!(self, Cell::Code { .. })
    }
}

/// A portable notebook: an ordered cell sequence with a stable format stamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotebookDocument {
    pub cells: Vec<Cell>,
    pub metadata: serde_json::Value,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

impl NotebookDocument {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            metadata: serde_json::json!({
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3"
                },
                "language_info": {
                    "name": "python",
                    "version": "3.8.0"
                }
            }),
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Split text into lines that keep their trailing newline, the way notebook
/// sources are stored.
fn split_keepends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            lines.push(text[start..=i].to_string());
            start = i + 1;
        }
    }
    if start < text.len() {
        lines.push(text[start..].to_string());
    }
    lines
}

/// Build the delivery notebook for a generated pipeline.
pub fn build_pipeline_notebook(
    title: &str,
    description: &str,
    code: &str,
    requirement: &str,
    dataset: Option<&DatasetSchema>,
) -> NotebookDocument {
    let mut cells = Vec::new();

    let mut title_md = format!("# {title}\n\n{description}");
    if !requirement.is_empty() {
        title_md.push_str(&format!("\n\n## User Story\n\n{requirement}"));
    }
    cells.push(Cell::markdown(&title_md));

    if let Some(dataset) = dataset {
        let dataset_md = format!(
            "## Dataset Information\n\n- **File**: `{}`\n- **Schema**: See schema metadata below\n\n### Schema Metadata\n\n```json\n{}\n```",
            dataset.file_path,
            store::schema_for_prompt(dataset)
        );
        cells.push(Cell::markdown(&dataset_md));
    }

    cells.push(Cell::markdown(
        "## Setup and Imports\n\nThis cell contains all necessary imports and Spark session initialization.",
    ));

    let setup_code = extract_setup_code(code);
    if setup_code.len() >= MIN_SETUP_LENGTH {
        cells.push(Cell::code(&setup_code));

        cells.push(Cell::markdown(
            "## Pipeline Code\n\nThis cell contains the main ETL pipeline logic.",
        ));

        let main_code = extract_main_code(code, &setup_code);
        if main_code != code && main_code.len() >= MIN_MAIN_LENGTH {
            cells.push(Cell::code(&main_code));
        } else {
            // Extraction failed; fall back to the whole block
            cells.push(Cell::code(code));
        }
    } else {
        cells.push(Cell::markdown(
            "## Pipeline Code\n\nThis cell contains the complete ETL pipeline.",
        ));
        cells.push(Cell::code(code));
    }

    cells.push(Cell::markdown(
        "## Execution Instructions\n\n\
         1. Ensure PySpark is installed: `pip install pyspark`\n\
         2. Make sure the dataset file exists at the specified path\n\
         3. Run all cells in order (Cell \u{2192} Run All)\n\
         4. Check the output for any errors or warnings",
    ));

    NotebookDocument::new(cells)
}

/// Build the delivery notebook for generated tests.
pub fn build_test_notebook(
    title: &str,
    description: &str,
    test_code: &str,
    pipeline_file: Option<&str>,
) -> NotebookDocument {
    let mut cells = Vec::new();

    let mut title_md = format!("# {title}\n\n{description}");
    if let Some(pipeline_file) = pipeline_file {
        title_md.push_str(&format!("\n\n**Tests for**: `{pipeline_file}`"));
    }
    cells.push(Cell::markdown(&title_md));

    cells.push(Cell::markdown(
        "## Setup\n\n\
         Before running tests, ensure:\n\
         1. PySpark and pytest are installed: `pip install pyspark pytest`\n\
         2. The pipeline code is available (either as a module or in the same directory)\n\
         3. Test data is available if required",
    ));

    let setup_code = extract_test_setup_code(test_code);
    if !setup_code.is_empty() {
        cells.push(Cell::markdown("## Test Setup\n\nImports and test fixtures."));
        cells.push(Cell::code(&setup_code));
    }

    cells.push(Cell::markdown(
        "## Test Cases\n\nRun these cells to execute individual tests or run all cells to execute the full test suite.",
    ));

    let test_functions = extract_test_functions(test_code);
    for function in &test_functions {
        if let Some(name) = extract_function_name(function) {
            cells.push(Cell::markdown(&format!(
                "### Test: {name}\n\nThis test validates specific functionality."
            )));
        }
        cells.push(Cell::code(function));
    }

    if test_functions.is_empty() {
        cells.push(Cell::code(test_code));
    }

    cells.push(Cell::markdown(
        "## Running Tests\n\n\
         You can run tests in two ways:\n\n\
         1. **Run all cells**: Execute all tests at once (Cell \u{2192} Run All)\n\
         2. **Run individual cells**: Run specific test cells to debug issues\n\n\
         Test results will be displayed in the output of each cell.",
    ));

    NotebookDocument::new(cells)
}

/// Extract the setup segment of pipeline code: imports plus a small window of
/// lines around SparkSession initialization.
pub fn extract_setup_code(code: &str) -> String {
    let lines: Vec<&str> = code.lines().collect();
    let mut setup_lines: Vec<&str> = Vec::new();
    let mut found_spark_session = false;

    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim_start();

        // Stop at main function definitions
        if stripped.starts_with("def main") || stripped.starts_with("if __name__") {
            break;
        }

        if stripped.starts_with("import") || stripped.starts_with("from") {
            setup_lines.push(line);
            continue;
        }

        if line.contains("SparkSession")
            || (line.to_lowercase().contains("spark") && line.contains('='))
        {
            if !found_spark_session {
                // Include a few surrounding lines with the initialization
                let start = i.saturating_sub(2);
                let end = (i + 5).min(lines.len());
                for surrounding in &lines[start..end] {
                    if !setup_lines.contains(surrounding) {
                        setup_lines.push(surrounding);
                    }
                }
                found_spark_session = true;
            }
            continue;
        }

        if found_spark_session && (stripped.starts_with('#') || stripped.is_empty()) {
            continue;
        }

        // Stop once actual pipeline logic starts after setup
        if found_spark_session && !stripped.is_empty() {
            let looks_like_logic = ["read", "load", "df", "DataFrame"]
                .iter()
                .any(|keyword| line.contains(keyword));
            if looks_like_logic {
                break;
            }
        }
    }

    setup_lines.join("\n").trim().to_string()
}

/// Everything after the last setup line; the whole code if setup was not
/// located in the original text.
pub fn extract_main_code(code: &str, setup_code: &str) -> String {
    if setup_code.is_empty() {
        return code.to_string();
    }

    let setup_lines: Vec<&str> = setup_code
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let code_lines: Vec<&str> = code.lines().collect();

    let mut last_setup_idx = None;
    for (i, line) in code_lines.iter().enumerate() {
        if setup_lines.contains(&line.trim()) {
            last_setup_idx = Some(i);
        }
    }

    match last_setup_idx {
        Some(idx) => {
            let main_code = code_lines[idx + 1..].join("\n").trim().to_string();
            if main_code.is_empty() {
                code.to_string()
            } else {
                main_code
            }
        }
        None => code.to_string(),
    }
}

/// Extract imports, fixture declarations, and bare definition headers from
/// test code, scanning until the first test function.
pub fn extract_test_setup_code(test_code: &str) -> String {
    let mut setup_lines = Vec::new();

    for line in test_code.lines() {
        let stripped = line.trim_start();
        if stripped.starts_with("def test_") {
            break;
        }
        if stripped.starts_with("import")
            || stripped.starts_with("from")
            || stripped.starts_with("@pytest.fixture")
            || stripped.starts_with("def ")
        {
            setup_lines.push(line);
        }
    }

    setup_lines.join("\n").trim().to_string()
}

/// Split test code into individual `def test_` functions. A function runs
/// until the next unindented non-empty line.
pub fn extract_test_functions(test_code: &str) -> Vec<String> {
    let mut functions = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_function = false;

    for line in test_code.lines() {
        let stripped = line.trim_start();
        if stripped.starts_with("def test_") {
            if !current.is_empty() {
                functions.push(current.join("\n"));
            }
            current = vec![line];
            in_function = true;
        } else if in_function {
            if !stripped.is_empty() && !line.starts_with(' ') {
                // New top-level definition ends the current function
                if !current.is_empty() {
                    functions.push(current.join("\n"));
                }
                current = Vec::new();
                in_function = false;
            } else {
                current.push(line);
            }
        }
    }

    if !current.is_empty() {
        functions.push(current.join("\n"));
    }

    functions
}

pub fn extract_function_name(function_code: &str) -> Option<String> {
    for line in function_code.lines() {
        let stripped = line.trim_start();
        if let Some(rest) = stripped.strip_prefix("def ") {
            return Some(rest.split('(').next().unwrap_or(rest).trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIPELINE_CODE: &str = r#"import logging
from pyspark.sql import SparkSession
from pyspark.sql import functions as F

spark = SparkSession.builder.appName("churn").getOrCreate()
logger = logging.getLogger(__name__)

df = spark.read.csv("data/telecom/customers.csv", header=True)
active = df.filter(F.col("status") == "active")
active.write.parquet("output/active_customers")
"#;

    const TEST_CODE: &str = r#"import pytest
from pyspark.sql import SparkSession

@pytest.fixture
def spark():
    return SparkSession.builder.master("local[1]").getOrCreate()

def test_filter_active(spark):
    df = spark.createDataFrame([("a", "active")], ["id", "status"])
    assert df.filter(df.status == "active").count() == 1

def test_filter_inactive(spark):
    df = spark.createDataFrame([("a", "inactive")], ["id", "status"])
    assert df.filter(df.status == "active").count() == 0
"#;

    #[test]
    fn test_split_keepends_preserves_newlines() {
        let lines = split_keepends("a\nb\nc");
        assert_eq!(lines, vec!["a\n", "b\n", "c"]);
        assert_eq!(lines.concat(), "a\nb\nc");
    }

    #[test]
    fn test_extract_setup_code_includes_imports_and_session() {
        let setup = extract_setup_code(PIPELINE_CODE);
        assert!(setup.contains("import logging"));
        assert!(setup.contains("from pyspark.sql import SparkSession"));
        assert!(setup.contains("SparkSession.builder.appName"));
        assert!(!setup.contains("write.parquet"));
    }

    #[test]
    fn test_extract_main_code_excludes_setup() {
        let setup = extract_setup_code(PIPELINE_CODE);
        let main = extract_main_code(PIPELINE_CODE, &setup);
        assert!(main.contains("write.parquet"));
        assert!(!main.contains("import logging"));
    }

    #[test]
    fn test_extract_main_code_without_setup_is_identity() {
        assert_eq!(extract_main_code("x = 1", ""), "x = 1");
    }

    #[test]
    fn test_pipeline_notebook_splits_setup_and_main() {
        let notebook =
            build_pipeline_notebook("Churn Pipeline", "Filters customers", PIPELINE_CODE, "story", None);
        let code_cells: Vec<_> = notebook.cells.iter().filter(|c| c.is_code()).collect();
        assert_eq!(code_cells.len(), 2);
        assert!(code_cells[0].source_text().contains("SparkSession"));
        assert!(code_cells[1].source_text().contains("write.parquet"));
    }

    #[test]
    fn test_pipeline_notebook_single_cell_for_tiny_setup() {
        let code = "x = 1\ny = 2\n";
        let notebook = build_pipeline_notebook("T", "d", code, "story", None);
        let code_cells: Vec<_> = notebook.cells.iter().filter(|c| c.is_code()).collect();
        assert_eq!(code_cells.len(), 1);
        assert!(code_cells[0].source_text().contains("x = 1"));
    }

    #[test]
    fn test_pipeline_notebook_has_at_least_three_cells() {
        let notebook = build_pipeline_notebook("T", "d", "x", "", None);
        assert!(notebook.cells.len() >= 3);
    }

    #[test]
    fn test_pipeline_notebook_embeds_dataset_info() {
        use crate::dataset::DatasetSchema;
        use std::collections::BTreeMap;

        let dataset = DatasetSchema {
            dataset_name: "telecom_churn".to_string(),
            domain: "telecom".to_string(),
            description: "d".to_string(),
            file_path: "data/telecom/customers.csv".to_string(),
            fields: BTreeMap::new(),
            sample_queries: None,
        };
        let notebook =
            build_pipeline_notebook("T", "d", PIPELINE_CODE, "story", Some(&dataset));
        let all_text: String = notebook.cells.iter().map(|c| c.source_text()).collect();
        assert!(all_text.contains("data/telecom/customers.csv"));
        assert!(all_text.contains("Schema Metadata"));
    }

    #[test]
    fn test_test_notebook_one_cell_per_function() {
        let notebook = build_test_notebook("Tests", "coverage", TEST_CODE, Some("churn.ipynb"));
        let code_cells: Vec<_> = notebook.cells.iter().filter(|c| c.is_code()).collect();
        // setup cell + two test functions
        assert_eq!(code_cells.len(), 3);
        assert!(code_cells[1].source_text().contains("def test_filter_active"));
        assert!(code_cells[2].source_text().contains("def test_filter_inactive"));
    }

    #[test]
    fn test_test_notebook_whole_block_when_no_functions() {
        let code = "assert 1 + 1 == 2\n";
        let notebook = build_test_notebook("Tests", "coverage", code, None);
        let code_cells: Vec<_> = notebook.cells.iter().filter(|c| c.is_code()).collect();
        assert_eq!(code_cells.len(), 1);
        assert!(notebook.cells.len() >= 3);
    }

    #[test]
    fn test_extract_test_functions_delimited_by_top_level() {
        let functions = extract_test_functions(TEST_CODE);
        assert_eq!(functions.len(), 2);
        assert!(functions[0].contains("test_filter_active"));
        assert!(functions[1].contains("test_filter_inactive"));
    }

    #[test]
    fn test_extract_test_setup_stops_at_first_test() {
        let setup = extract_test_setup_code(TEST_CODE);
        assert!(setup.contains("import pytest"));
        assert!(setup.contains("@pytest.fixture"));
        assert!(setup.contains("def spark():"));
        assert!(!setup.contains("def test_filter_active"));
    }

    #[test]
    fn test_extract_function_name() {
        assert_eq!(
            extract_function_name("def test_foo(spark):\n    pass"),
            Some("test_foo".to_string())
        );
        assert_eq!(extract_function_name("x = 1"), None);
    }

    #[test]
    fn test_notebook_round_trips_through_json() {
        let notebook = build_test_notebook("Tests", "coverage", TEST_CODE, None);
        let json = notebook.to_json().unwrap();
        let parsed: NotebookDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.nbformat, 4);
        assert_eq!(parsed.nbformat_minor, 4);
        assert_eq!(parsed.cells.len(), notebook.cells.len());
        let original: String = notebook.cells.iter().map(|c| c.source_text()).collect();
        let restored: String = parsed.cells.iter().map(|c| c.source_text()).collect();
        assert_eq!(original, restored);
    }
}
