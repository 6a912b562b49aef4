//! The stage driver: sequencing, guard checks, and the failure policy.
//!
//! Generation failures are unrecoverable (nothing downstream has meaningful
//! input) and set the run-level error. Quality-assessment failures
//! (validation, review, docs) degrade to structured negative results so they
//! never block delivery of the primary artifacts.

use crate::dataset::{store, DatasetStore};
use crate::format;
use crate::generation::reply::{self, ArtifactReply};
use crate::generation::{prompt, TextGenerator};
use crate::notebook;
use crate::platform::Publisher;
use crate::validate::CodeValidator;
use crate::workflow::publish;
use crate::workflow::stage::Stage;
use crate::workflow::state::{Documentation, GeneratedArtifact, ReviewReport, WorkflowState};

pub struct WorkflowRunner<G, P> {
    generator: G,
    publisher: P,
    datasets: DatasetStore,
    validator: CodeValidator,
}

impl<G: TextGenerator, P: Publisher> WorkflowRunner<G, P> {
    pub fn new(generator: G, publisher: P, datasets: DatasetStore) -> Self {
        Self {
            generator,
            publisher,
            datasets,
            validator: CodeValidator::new(),
        }
    }

    /// Run all stages in order over a fresh state. Guard checks live here,
    /// not in the stages, so the short-circuit policy is in one place.
    pub async fn run(&self, requirement: &str) -> WorkflowState {
        let mut state = WorkflowState::new(requirement);

        for stage in Stage::ALL {
            state.stage = stage.name().to_string();
            tracing::info!(stage = %stage, "Running stage");

            state = match stage {
                Stage::DetectDataset => self.detect_dataset(state),
                Stage::GeneratePipeline => self.generate_pipeline(state).await,
                Stage::GenerateTests => {
                    if state.has_error() || state.pipeline.is_none() {
                        state.error =
                            Some("Cannot generate tests: pipeline generation failed".to_string());
                        state
                    } else {
                        self.generate_tests(state).await
                    }
                }
                Stage::ValidateCode => {
                    if state.has_error() || state.pipeline.is_none() {
                        state.error =
                            Some("Cannot validate: pipeline generation failed".to_string());
                        state
                    } else {
                        self.validate_code(state)
                    }
                }
                Stage::ReviewCode => {
                    if state.has_error() || state.pipeline.is_none() || state.tests.is_none() {
                        state.error = Some("Cannot review: missing generated code".to_string());
                        state
                    } else {
                        self.review_code(state).await
                    }
                }
                Stage::GenerateDocs => {
                    if state.has_error() || state.pipeline.is_none() {
                        state.error =
                            Some("Cannot generate docs: pipeline generation failed".to_string());
                        state
                    } else {
                        self.generate_docs(state).await
                    }
                }
                Stage::Publish => self.publish(state).await,
            };
        }

        state
    }

    /// Best-effort: a missing dataset is a legitimate outcome, never an error.
    fn detect_dataset(&self, mut state: WorkflowState) -> WorkflowState {
        match self.datasets.find_by_reference(&state.requirement) {
            Some(dataset) => {
                tracing::info!(
                    dataset = %dataset.dataset_name,
                    domain = %dataset.domain,
                    "Detected dataset reference"
                );
                state.dataset = Some(dataset.clone());
            }
            None => {
                tracing::info!("No dataset reference detected, proceeding without context");
            }
        }
        state
    }

    async fn generate_pipeline(&self, mut state: WorkflowState) -> WorkflowState {
        let context = state.dataset.as_ref().map(store::schema_for_prompt);
        let prompt = prompt::pipeline_prompt(&state.requirement, context.as_deref());

        match self.generator.complete(&prompt.system, &prompt.user).await {
            Ok(text) => {
                let parsed = reply::parse_artifact_reply(
                    &text,
                    "pipeline.py",
                    "Generated PySpark pipeline",
                );
                let artifact = self.finalize_pipeline(parsed.into_artifact(), &state);
                tracing::info!(file = %artifact.file_name, "Pipeline generated");
                state.pipeline = Some(artifact);
            }
            Err(e) => {
                tracing::error!(error = %e, "Pipeline generation failed");
                state.error = Some(format!("Pipeline generation failed: {e}"));
            }
        }

        state
    }

    fn finalize_pipeline(&self, raw: ArtifactReply, state: &WorkflowState) -> GeneratedArtifact {
        let code = format::format_code(&raw.code);
        let file_name = notebook_file_name(&raw.file_name);
        let notebook = notebook::build_pipeline_notebook(
            &notebook_title(&file_name),
            &raw.description,
            &code,
            &state.requirement,
            state.dataset.as_ref(),
        );
        GeneratedArtifact {
            code,
            file_name,
            description: raw.description,
            notebook,
        }
    }

    async fn generate_tests(&self, mut state: WorkflowState) -> WorkflowState {
        let pipeline = state.pipeline.as_ref().expect("guarded by driver");
        let prompt = prompt::tests_prompt(&pipeline.code, &pipeline.description);

        match self.generator.complete(&prompt.system, &prompt.user).await {
            Ok(text) => {
                let raw = reply::parse_artifact_reply(
                    &text,
                    "test_pipeline.py",
                    "Generated tests for PySpark pipeline",
                )
                .into_artifact();

                let code = format::format_code(&raw.code);
                let file_name = notebook_file_name(&raw.file_name);
                let notebook = notebook::build_test_notebook(
                    &notebook_title(&file_name),
                    &raw.description,
                    &code,
                    Some(&pipeline.file_name),
                );

                tracing::info!(file = %file_name, "Tests generated");
                state.tests = Some(GeneratedArtifact {
                    code,
                    file_name,
                    description: raw.description,
                    notebook,
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Test generation failed");
                state.error = Some(format!("Test generation failed: {e}"));
            }
        }

        state
    }

    /// Validation never aborts the run; its report is the quality signal.
    fn validate_code(&self, mut state: WorkflowState) -> WorkflowState {
        let pipeline = state.pipeline.as_ref().expect("guarded by driver");
        let report = self.validator.validate(&pipeline.code);

        if report.is_valid {
            tracing::info!("Code validation passed");
        } else {
            tracing::warn!(
                syntax_errors = report.syntax_errors.len(),
                lint_issues = report.lint_issues.len(),
                "Validation found issues"
            );
        }
        if !report.warnings.is_empty() {
            tracing::info!(warnings = report.warnings.len(), "Validation warnings");
        }

        state.validation = Some(report);
        state
    }

    async fn review_code(&self, mut state: WorkflowState) -> WorkflowState {
        let pipeline = state.pipeline.as_ref().expect("guarded by driver");
        let tests = state.tests.as_ref().expect("guarded by driver");
        let prompt = prompt::review_prompt(&pipeline.code, &tests.code, &pipeline.description);

        let review = match self.generator.complete(&prompt.system, &prompt.user).await {
            Ok(text) => reply::parse_review_reply(&text),
            Err(e) => {
                // Review failures never block delivery of the artifacts
                tracing::error!(error = %e, "Review generation failed");
                ReviewReport {
                    review: format!("Review generation failed: {e}"),
                    suggestions: Vec::new(),
                    score: None,
                    approved: false,
                }
            }
        };

        tracing::info!(
            score = ?review.score,
            approved = review.approved,
            suggestions = review.suggestions.len(),
            "Code review completed"
        );
        state.review = Some(review);
        state
    }

    async fn generate_docs(&self, mut state: WorkflowState) -> WorkflowState {
        let pipeline = state.pipeline.as_ref().expect("guarded by driver");
        let prompt =
            prompt::docs_prompt(&pipeline.code, &pipeline.description, &state.requirement);

        let documentation = match self.generator.complete(&prompt.system, &prompt.user).await {
            Ok(text) => reply::parse_docs_reply(&text),
            Err(e) => {
                // Placeholder docs instead of aborting
                tracing::error!(error = %e, "Documentation generation failed");
                Documentation {
                    content: format!(
                        "# Pipeline Documentation\n\nDocumentation generation failed: {e}"
                    ),
                    file_name: "README.md".to_string(),
                    description: "Placeholder documentation".to_string(),
                }
            }
        };

        tracing::info!(file = %documentation.file_name, "Documentation generated");
        state.documentation = Some(documentation);
        state
    }

    async fn publish(&self, mut state: WorkflowState) -> WorkflowState {
        if let Some(error) = &state.error {
            tracing::error!(error = %error, "Skipping publish due to earlier error");
            return state;
        }

        if state.pipeline.is_none() || state.tests.is_none() {
            state.error = Some("Cannot create PR: missing generated code".to_string());
            return state;
        }

        let files = match publish::assemble_files(&state) {
            Ok(files) => files,
            Err(e) => {
                state.error = Some(format!("PR creation failed: {e}"));
                return state;
            }
        };
        let title = publish::pr_title(&state);
        let body = publish::pr_body(&state);

        match self.publisher.create_pr_with_files(&files, &title, &body).await {
            Ok(url) if !url.is_empty() => {
                tracing::info!(url = %url, "PR created");
                state.pr_url = Some(url);
            }
            Ok(_) => {
                state.error = Some("Failed to create PR".to_string());
            }
            Err(e) => {
                tracing::error!(error = %e, "PR creation failed");
                state.error = Some(format!("PR creation failed: {e}"));
            }
        }

        state
    }
}

/// Delivery artifacts are notebooks; swap the generated extension for .ipynb.
fn notebook_file_name(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.ipynb"),
        _ => format!("{file_name}.ipynb"),
    }
}

fn notebook_title(file_name: &str) -> String {
    let stem = file_name.strip_suffix(".ipynb").unwrap_or(file_name);
    stem.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::dataset::{DatasetSchema, DatasetStore, FieldSchema};
    use crate::error::{AppError, Result};

    struct ScriptedGenerator {
        replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<std::result::Result<String, String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(AppError::Generation(message)),
                None => Err(AppError::Internal("no scripted reply left".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        url: Option<String>,
        fail: bool,
        published: Mutex<Option<BTreeMap<String, String>>>,
    }

    impl RecordingPublisher {
        fn returning(url: &str) -> Self {
            Self {
                url: Some(url.to_string()),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn create_pr_with_files(
            &self,
            files: &BTreeMap<String, String>,
            _title: &str,
            _body: &str,
        ) -> Result<String> {
            *self.published.lock().unwrap() = Some(files.clone());
            if self.fail {
                return Err(AppError::GitHubApi("boom".to_string()));
            }
            Ok(self.url.clone().unwrap_or_default())
        }
    }

    fn telecom_store() -> DatasetStore {
        let mut fields = BTreeMap::new();
        fields.insert(
            "customer_id".to_string(),
            FieldSchema {
                field_type: "string".to_string(),
                description: "id".to_string(),
                nullable: false,
                primary_key: true,
                format: None,
                enum_values: None,
                min: None,
                max: None,
            },
        );
        DatasetStore::from_schemas(vec![DatasetSchema {
            dataset_name: "telecom_churn".to_string(),
            domain: "telecom".to_string(),
            description: "Telecom customers".to_string(),
            file_path: "data/telecom/customers.csv".to_string(),
            fields,
            sample_queries: None,
        }])
    }

    fn artifact_reply(file_name: &str, code: &str) -> String {
        serde_json::json!({
            "file_name": file_name,
            "description": "Filters active customers",
            "code": code,
        })
        .to_string()
    }

    fn review_reply() -> String {
        serde_json::json!({
            "review": "Solid pipeline",
            "suggestions": ["cache the dataframe"],
            "score": 85.0,
            "approved": true,
        })
        .to_string()
    }

    fn docs_reply() -> String {
        serde_json::json!({
            "file_name": "churn.md",
            "description": "Pipeline docs",
            "content": "# Churn Pipeline",
        })
        .to_string()
    }

    const PIPELINE_CODE: &str = "\"\"\"Churn.\"\"\"\nimport logging\nfrom pyspark.sql import SparkSession\n\nspark = SparkSession.builder.getOrCreate()\ntry:\n    df = spark.read.csv(\"data.csv\")\nexcept Exception:\n    logging.exception(\"failed\")\n";

    const TEST_CODE: &str =
        "import pytest\nfrom pyspark.sql import SparkSession\n\ndef test_read(spark):\n    assert spark is not None\n";

    #[tokio::test]
    async fn test_happy_path_populates_everything() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("churn.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_churn.py", TEST_CODE)),
            Ok(review_reply()),
            Ok(docs_reply()),
        ]);
        let publisher = RecordingPublisher::returning("https://github.com/acme/repo/pull/7");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner
            .run("Using the telecom dataset, filter active customers")
            .await;

        assert_eq!(state.error, None);
        assert_eq!(state.stage, "publish");
        assert_eq!(
            state.dataset.as_ref().map(|d| d.dataset_name.as_str()),
            Some("telecom_churn")
        );
        assert_eq!(
            state.pipeline.as_ref().map(|p| p.file_name.as_str()),
            Some("churn.ipynb")
        );
        assert_eq!(
            state.tests.as_ref().map(|t| t.file_name.as_str()),
            Some("test_churn.ipynb")
        );
        assert!(state.validation.as_ref().is_some_and(|v| v.is_valid));
        assert!(state.review.as_ref().is_some_and(|r| r.approved));
        assert!(state.documentation.is_some());
        assert_eq!(
            state.pr_url.as_deref(),
            Some("https://github.com/acme/repo/pull/7")
        );
    }

    #[tokio::test]
    async fn test_published_file_paths_use_namespaces() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Ok(review_reply()),
            Ok(docs_reply()),
        ]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/1");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("filter something unrelated").await;
        assert!(state.pr_url.is_some());

        let published = runner.publisher.published.lock().unwrap().clone().unwrap();
        let paths: Vec<_> = published.keys().cloned().collect();
        assert_eq!(
            paths,
            vec![
                "docs/churn.md",
                "notebooks/pipelines/x.ipynb",
                "notebooks/tests/test_x.ipynb"
            ]
        );
    }

    #[tokio::test]
    async fn test_pipeline_failure_short_circuits_run() {
        let generator =
            ScriptedGenerator::new(vec![Err("model unavailable".to_string())]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/1");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("filter active customers").await;

        // Each guarded stage overwrites the error; the docs guard runs last
        // before publish skips.
        assert_eq!(
            state.error.as_deref(),
            Some("Cannot generate docs: pipeline generation failed")
        );
        assert!(state.pipeline.is_none());
        assert!(state.tests.is_none());
        assert!(state.validation.is_none());
        assert!(state.review.is_none());
        assert!(state.documentation.is_none());
        assert!(state.pr_url.is_none());
        // Publisher never invoked
        assert!(runner.publisher.published.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_syntax_errors_do_not_block_delivery() {
        let broken = "from pyspark.sql import SparkSession\ndef broken(:\n    pass\n";
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("broken.py", broken)),
            Ok(artifact_reply("test_broken.py", TEST_CODE)),
            Ok(review_reply()),
            Ok(docs_reply()),
        ]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/2");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("build something").await;

        let validation = state.validation.as_ref().unwrap();
        assert!(!validation.is_valid);
        assert!(!validation.syntax_errors.is_empty());
        // The run still reached review, docs, and publish
        assert!(state.review.is_some());
        assert!(state.documentation.is_some());
        assert_eq!(state.pr_url.as_deref(), Some("https://example.com/pr/2"));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_review_failure_degrades_to_placeholder() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Err("review service down".to_string()),
            Ok(docs_reply()),
        ]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/3");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("build something").await;

        let review = state.review.as_ref().unwrap();
        assert!(!review.approved);
        assert!(review.suggestions.is_empty());
        assert_eq!(review.score, None);
        assert!(review.review.contains("Review generation failed"));
        assert_eq!(state.error, None);
        assert!(state.pr_url.is_some());
    }

    #[tokio::test]
    async fn test_docs_failure_degrades_to_placeholder() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Ok(review_reply()),
            Err("docs service down".to_string()),
        ]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/4");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("build something").await;

        let docs = state.documentation.as_ref().unwrap();
        assert_eq!(docs.file_name, "README.md");
        assert!(docs.content.contains("Documentation generation failed"));
        assert_eq!(state.error, None);
        assert!(state.pr_url.is_some());
    }

    #[tokio::test]
    async fn test_publish_failure_sets_run_error() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Ok(review_reply()),
            Ok(docs_reply()),
        ]);
        let runner =
            WorkflowRunner::new(generator, RecordingPublisher::failing(), telecom_store());

        let state = runner.run("build something").await;

        assert!(state
            .error
            .as_ref()
            .is_some_and(|e| e.starts_with("PR creation failed")));
        assert!(state.pr_url.is_none());
    }

    #[tokio::test]
    async fn test_publish_empty_url_sets_run_error() {
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Ok(review_reply()),
            Ok(docs_reply()),
        ]);
        let runner =
            WorkflowRunner::new(generator, RecordingPublisher::returning(""), telecom_store());

        let state = runner.run("build something").await;
        assert_eq!(state.error.as_deref(), Some("Failed to create PR"));
    }

    #[tokio::test]
    async fn test_prose_review_reply_uses_bullet_fallback() {
        let prose = "The code is reasonable overall.\n- add schema validation\n- avoid collect()\n";
        let generator = ScriptedGenerator::new(vec![
            Ok(artifact_reply("x.py", PIPELINE_CODE)),
            Ok(artifact_reply("test_x.py", TEST_CODE)),
            Ok(prose.to_string()),
            Ok(docs_reply()),
        ]);
        let publisher = RecordingPublisher::returning("https://example.com/pr/5");
        let runner = WorkflowRunner::new(generator, publisher, telecom_store());

        let state = runner.run("build something").await;

        let review = state.review.as_ref().unwrap();
        assert!(!review.approved);
        assert_eq!(review.score, None);
        assert_eq!(
            review.suggestions,
            vec!["add schema validation", "avoid collect()"]
        );
    }

    #[test]
    fn test_notebook_file_name_swaps_extension() {
        assert_eq!(notebook_file_name("churn.py"), "churn.ipynb");
        assert_eq!(notebook_file_name("churn"), "churn.ipynb");
        assert_eq!(notebook_file_name("churn.ipynb"), "churn.ipynb");
    }
}
