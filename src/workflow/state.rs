use serde::{Deserialize, Serialize};

use crate::dataset::DatasetSchema;
use crate::notebook::NotebookDocument;

/// A finalized generated artifact: the raw code that feeds downstream prompts
/// and validation, plus the structured notebook that is actually delivered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub code: String,
    pub file_name: String,
    pub description: String,
    pub notebook: NotebookDocument,
}

/// Structured output of the code validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub syntax_errors: Vec<String>,
    /// Lint and missing-import issues; all count toward invalidity.
    pub lint_issues: Vec<String>,
    /// Best-practice warnings; never affect validity.
    pub warnings: Vec<String>,
}

/// Structured output of the review generation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub review: String,
    pub suggestions: Vec<String>,
    /// Quality score 0-100 when the reviewer supplied one.
    pub score: Option<f64>,
    pub approved: bool,
}

/// Generated markdown documentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Documentation {
    pub content: String,
    pub file_name: String,
    pub description: String,
}

/// The single mutable record threaded through all workflow stages.
///
/// Once `error` is set, later stages either short-circuit or degrade to
/// placeholders; they never populate real content past a failed generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub requirement: String,
    pub dataset: Option<DatasetSchema>,
    pub pipeline: Option<GeneratedArtifact>,
    pub tests: Option<GeneratedArtifact>,
    pub validation: Option<ValidationReport>,
    pub review: Option<ReviewReport>,
    pub documentation: Option<Documentation>,
    pub pr_url: Option<String>,
    pub error: Option<String>,
    pub stage: String,
}

impl WorkflowState {
    pub fn new(requirement: &str) -> Self {
        Self {
            requirement: requirement.to_string(),
            dataset: None,
            pipeline: None,
            tests: None,
            validation: None,
            review: None,
            documentation: None,
            pr_url: None,
            error: None,
            stage: "initialized".to_string(),
        }
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}
