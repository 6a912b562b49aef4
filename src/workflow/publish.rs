//! Assembly of the publish payload: the file mapping and the pull-request
//! title and body summarizing the whole run.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::workflow::state::WorkflowState;

/// Map each artifact to its repository path. Pipeline and test notebooks get
/// their own namespaces; documentation lands under `docs/` when present.
pub fn assemble_files(state: &WorkflowState) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();

    if let Some(pipeline) = &state.pipeline {
        files.insert(
            format!("notebooks/pipelines/{}", pipeline.file_name),
            pipeline.notebook.to_json()?,
        );
    }

    if let Some(tests) = &state.tests {
        files.insert(
            format!("notebooks/tests/{}", tests.file_name),
            tests.notebook.to_json()?,
        );
    }

    if let Some(docs) = &state.documentation {
        files.insert(format!("docs/{}", docs.file_name), docs.content.clone());
    }

    Ok(files)
}

pub fn pr_title(state: &WorkflowState) -> String {
    match &state.pipeline {
        Some(pipeline) => format!("ETL Pipeline: {}", pipeline.description),
        None => "ETL Pipeline".to_string(),
    }
}

/// Human-readable summary embedding the requirement and every quality signal
/// the run produced.
pub fn pr_body(state: &WorkflowState) -> String {
    let mut body = format!(
        "## Generated ETL Pipeline\n\n**User Story:**\n{}\n",
        state.requirement
    );

    if let Some(dataset) = &state.dataset {
        body.push_str(&format!(
            "\n**Dataset:**\n- Name: `{}`\n- Domain: {}\n- File: `{}`\n",
            dataset.dataset_name, dataset.domain, dataset.file_path
        ));
    }

    if let Some(pipeline) = &state.pipeline {
        body.push_str(&format!(
            "\n**Pipeline:**\n- File: `{}`\n- Description: {}\n",
            pipeline.file_name, pipeline.description
        ));
    }

    if let Some(tests) = &state.tests {
        body.push_str(&format!(
            "\n**Tests:**\n- File: `{}`\n- Description: {}\n",
            tests.file_name, tests.description
        ));
    }

    if let Some(validation) = &state.validation {
        let status = if validation.is_valid {
            "Passed"
        } else {
            "Issues Found"
        };
        body.push_str(&format!("\n**Validation:**\n- Status: {status}\n"));
        if !validation.syntax_errors.is_empty() {
            body.push_str(&format!(
                "- Syntax Errors: {}\n",
                validation.syntax_errors.len()
            ));
        }
        if !validation.lint_issues.is_empty() {
            body.push_str(&format!(
                "- Linting Issues: {}\n",
                validation.lint_issues.len()
            ));
        }
        if !validation.warnings.is_empty() {
            body.push_str(&format!("- Warnings: {}\n", validation.warnings.len()));
        }
    }

    if let Some(review) = &state.review {
        let score = match review.score {
            Some(score) => format!("{score}/100"),
            None => "N/A".to_string(),
        };
        let status = if review.approved {
            "Approved"
        } else {
            "Needs Improvement"
        };
        body.push_str(&format!(
            "\n**Code Review:**\n- Score: {score}\n- Status: {status}\n- Suggestions: {}\n",
            review.suggestions.len()
        ));
        if !review.suggestions.is_empty() {
            body.push_str("\n**Top Suggestions:**\n");
            for suggestion in review.suggestions.iter().take(5) {
                body.push_str(&format!("- {suggestion}\n"));
            }
        }
    }

    if let Some(docs) = &state.documentation {
        body.push_str(&format!("\n**Documentation:**\n- File: `docs/{}`\n", docs.file_name));
    }

    body.push_str("\n---\n*This PR was automatically generated by pipewright.*\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::NotebookDocument;
    use crate::workflow::state::{
        Documentation, GeneratedArtifact, ReviewReport, ValidationReport, WorkflowState,
    };

    fn artifact(file_name: &str) -> GeneratedArtifact {
        GeneratedArtifact {
            code: "import pyspark".to_string(),
            file_name: file_name.to_string(),
            description: "Filters active customers".to_string(),
            notebook: NotebookDocument::new(vec![crate::notebook::Cell::code("import pyspark")]),
        }
    }

    fn populated_state() -> WorkflowState {
        let mut state = WorkflowState::new("filter active customers");
        state.pipeline = Some(artifact("x.ipynb"));
        state.tests = Some(artifact("test_x.ipynb"));
        state
    }

    #[test]
    fn test_assemble_files_uses_namespaces() {
        let files = assemble_files(&populated_state()).unwrap();
        let paths: Vec<_> = files.keys().cloned().collect();
        assert_eq!(
            paths,
            vec!["notebooks/pipelines/x.ipynb", "notebooks/tests/test_x.ipynb"]
        );
    }

    #[test]
    fn test_assemble_files_includes_docs_when_present() {
        let mut state = populated_state();
        state.documentation = Some(Documentation {
            content: "# Docs".to_string(),
            file_name: "README.md".to_string(),
            description: "docs".to_string(),
        });
        let files = assemble_files(&state).unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files.get("docs/README.md").map(String::as_str), Some("# Docs"));
    }

    #[test]
    fn test_file_content_is_notebook_json() {
        let files = assemble_files(&populated_state()).unwrap();
        let content = files.get("notebooks/pipelines/x.ipynb").unwrap();
        let notebook: NotebookDocument = serde_json::from_str(content).unwrap();
        assert_eq!(notebook.nbformat, 4);
    }

    #[test]
    fn test_pr_body_embeds_requirement_and_summaries() {
        let mut state = populated_state();
        state.validation = Some(ValidationReport {
            is_valid: false,
            syntax_errors: vec!["Syntax error at line 3: invalid syntax".to_string()],
            lint_issues: vec![],
            warnings: vec!["Consider adding logging".to_string()],
        });
        state.review = Some(ReviewReport {
            review: "ok".to_string(),
            suggestions: vec!["cache the dataframe".to_string()],
            score: Some(72.0),
            approved: false,
        });

        let body = pr_body(&state);
        assert!(body.contains("filter active customers"));
        assert!(body.contains("Issues Found"));
        assert!(body.contains("Syntax Errors: 1"));
        assert!(body.contains("Score: 72/100"));
        assert!(body.contains("- cache the dataframe"));
    }

    #[test]
    fn test_pr_title_uses_pipeline_description() {
        assert_eq!(
            pr_title(&populated_state()),
            "ETL Pipeline: Filters active customers"
        );
    }
}
