//! Parsers for generation-service replies.
//!
//! Replies are expected to be JSON, frequently wrapped in a markdown code
//! fence, and occasionally plain prose. Every parser here always produces a
//! usable value: a malformed reply degrades to a fallback, never an error.

use regex::Regex;
use serde::Deserialize;

use crate::workflow::state::{Documentation, ReviewReport};

const MAX_FALLBACK_SUGGESTIONS: usize = 10;

/// A code artifact extracted from a reply, before notebook structuring.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactReply {
    pub code: String,
    pub file_name: String,
    pub description: String,
}

/// How an artifact reply was obtained. The two-variant shape makes the
/// always-produces-an-artifact guarantee explicit to callers that care
/// whether the reply was well-formed.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyOutcome {
    /// The reply carried the expected JSON object.
    Parsed(ArtifactReply),
    /// The reply was not parseable; the raw text stands in as the code body.
    Fallback(ArtifactReply),
}

impl ReplyOutcome {
    pub fn into_artifact(self) -> ArtifactReply {
        match self {
            ReplyOutcome::Parsed(artifact) | ReplyOutcome::Fallback(artifact) => artifact,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ReplyOutcome::Fallback(_))
    }
}

#[derive(Deserialize)]
struct ArtifactJson {
    file_name: String,
    description: String,
    code: CodeValue,
}

/// `code` arrives either as a single string or as a list of lines.
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeValue {
    Text(String),
    Lines(Vec<String>),
}

impl CodeValue {
    fn into_text(self) -> String {
        match self {
            CodeValue::Text(text) => text,
            CodeValue::Lines(lines) => lines.join("\n"),
        }
    }
}

/// Strip a leading ```json / ``` fence and a trailing ``` fence if present.
fn strip_code_fence(reply: &str) -> &str {
    let mut content = reply.trim();
    if let Some(rest) = content.strip_prefix("```json") {
        content = rest;
    } else if let Some(rest) = content.strip_prefix("```") {
        content = rest;
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest;
    }
    content.trim()
}

/// Parse a pipeline or test generation reply into an artifact.
pub fn parse_artifact_reply(
    reply: &str,
    fallback_file_name: &str,
    fallback_description: &str,
) -> ReplyOutcome {
    let content = strip_code_fence(reply);

    match serde_json::from_str::<ArtifactJson>(content) {
        Ok(parsed) => ReplyOutcome::Parsed(ArtifactReply {
            code: parsed.code.into_text(),
            file_name: parsed.file_name,
            description: parsed.description,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "Reply was not valid JSON, using raw text as code");
            ReplyOutcome::Fallback(ArtifactReply {
                code: reply.to_string(),
                file_name: fallback_file_name.to_string(),
                description: fallback_description.to_string(),
            })
        }
    }
}

#[derive(Deserialize)]
struct ReviewJson {
    #[serde(default)]
    review: String,
    #[serde(default)]
    suggestions: Vec<String>,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    approved: bool,
}

/// Parse a review reply. A prose reply falls back to the full text as the
/// review, with `- ` bullet lines extracted as suggestions (capped), no score,
/// and not approved.
pub fn parse_review_reply(reply: &str) -> ReviewReport {
    let content = strip_code_fence(reply);

    match serde_json::from_str::<ReviewJson>(content) {
        Ok(parsed) => ReviewReport {
            review: parsed.review,
            suggestions: parsed.suggestions,
            score: parsed.score,
            approved: parsed.approved,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Review reply was not valid JSON, extracting bullets");
            let bullet = Regex::new(r"(?m)^\s*- (.+)$").expect("valid bullet regex");
            let suggestions = bullet
                .captures_iter(reply)
                .take(MAX_FALLBACK_SUGGESTIONS)
                .map(|c| c[1].trim().to_string())
                .collect();

            ReviewReport {
                review: reply.to_string(),
                suggestions,
                score: None,
                approved: false,
            }
        }
    }
}

#[derive(Deserialize)]
struct DocsJson {
    file_name: String,
    description: String,
    content: String,
}

/// Parse a documentation reply. A prose reply is taken wholesale as markdown.
pub fn parse_docs_reply(reply: &str) -> Documentation {
    let content = strip_code_fence(reply);

    match serde_json::from_str::<DocsJson>(content) {
        Ok(parsed) => Documentation {
            content: parsed.content,
            file_name: parsed.file_name,
            description: parsed.description,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Docs reply was not valid JSON, using raw text as markdown");
            Documentation {
                content: reply.to_string(),
                file_name: "README.md".to_string(),
                description: "Generated pipeline documentation".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_artifact_plain_json() {
        let reply = r#"{"file_name": "churn.py", "description": "Churn pipeline", "code": "import pyspark"}"#;
        let outcome = parse_artifact_reply(reply, "pipeline.py", "Generated pipeline");
        assert!(!outcome.is_fallback());
        let artifact = outcome.into_artifact();
        assert_eq!(artifact.file_name, "churn.py");
        assert_eq!(artifact.code, "import pyspark");
    }

    #[test]
    fn test_parse_artifact_fenced_json() {
        let reply = "```json\n{\"file_name\": \"x.py\", \"description\": \"d\", \"code\": \"pass\"}\n```";
        let outcome = parse_artifact_reply(reply, "pipeline.py", "Generated pipeline");
        assert!(!outcome.is_fallback());
        assert_eq!(outcome.into_artifact().file_name, "x.py");
    }

    #[test]
    fn test_parse_artifact_code_as_line_list() {
        let reply =
            r#"{"file_name": "x.py", "description": "d", "code": ["import pyspark", "df = 1"]}"#;
        let artifact = parse_artifact_reply(reply, "pipeline.py", "d").into_artifact();
        assert_eq!(artifact.code, "import pyspark\ndf = 1");
    }

    #[test]
    fn test_parse_artifact_prose_falls_back() {
        let reply = "Here is your pipeline:\n\nimport pyspark\n";
        let outcome = parse_artifact_reply(reply, "pipeline.py", "Generated PySpark pipeline");
        assert!(outcome.is_fallback());
        let artifact = outcome.into_artifact();
        assert_eq!(artifact.file_name, "pipeline.py");
        assert!(artifact.code.contains("import pyspark"));
    }

    #[test]
    fn test_parse_review_json() {
        let reply = r#"{"review": "Looks good", "suggestions": ["add logging"], "score": 88.0, "approved": true}"#;
        let report = parse_review_reply(reply);
        assert!(report.approved);
        assert_eq!(report.score, Some(88.0));
        assert_eq!(report.suggestions, vec!["add logging"]);
    }

    #[test]
    fn test_parse_review_prose_extracts_bullets() {
        let reply = "Overall the code is fine.\n- add error handling\n- cache the dataframe\nDone.";
        let report = parse_review_reply(reply);
        assert!(!report.approved);
        assert_eq!(report.score, None);
        assert_eq!(
            report.suggestions,
            vec!["add error handling", "cache the dataframe"]
        );
        assert!(report.review.contains("Overall the code is fine."));
    }

    #[test]
    fn test_parse_review_prose_caps_suggestions() {
        let bullets: String = (0..20).map(|i| format!("- suggestion {i}\n")).collect();
        let report = parse_review_reply(&bullets);
        assert_eq!(report.suggestions.len(), MAX_FALLBACK_SUGGESTIONS);
    }

    #[test]
    fn test_parse_docs_fallback() {
        let docs = parse_docs_reply("# My Pipeline\n\nIt does things.");
        assert_eq!(docs.file_name, "README.md");
        assert!(docs.content.starts_with("# My Pipeline"));
    }

    #[test]
    fn test_parse_docs_json() {
        let reply = r##"{"file_name": "churn.md", "description": "docs", "content": "# Churn"}"##;
        let docs = parse_docs_reply(reply);
        assert_eq!(docs.file_name, "churn.md");
        assert_eq!(docs.content, "# Churn");
    }
}
