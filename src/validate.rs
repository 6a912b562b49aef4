//! Validation of generated PySpark code.
//!
//! Four independent checks feed one report: a real syntax parse
//! (tree-sitter), a required-imports check, surface linting, and
//! best-practice warnings. Only the first three affect validity.

use regex::Regex;

use crate::workflow::state::ValidationReport;

const MAX_LINE_LENGTH: usize = 120;

pub struct CodeValidator {
    print_call: Regex,
    trailing_whitespace: Regex,
}

impl CodeValidator {
    pub fn new() -> Self {
        Self {
            print_call: Regex::new(r"\bprint\s*\(").expect("valid print regex"),
            trailing_whitespace: Regex::new(r"(?m)[ \t]+$").expect("valid whitespace regex"),
        }
    }

    /// Run all checks over the code. Deterministic: identical input always
    /// yields an identical report.
    pub fn validate(&self, code: &str) -> ValidationReport {
        let (syntax_ok, syntax_errors) = validate_syntax(code);
        let mut lint_issues = self.lint(code);
        lint_issues.extend(validate_pyspark_imports(code));
        let warnings = best_practice_warnings(code);

        let is_valid = syntax_ok && syntax_errors.is_empty() && lint_issues.is_empty();

        ValidationReport {
            is_valid,
            syntax_errors,
            lint_issues,
            warnings,
        }
    }

    fn lint(&self, code: &str) -> Vec<String> {
        let mut issues = Vec::new();

        for (i, line) in code.lines().enumerate() {
            if line.len() > MAX_LINE_LENGTH {
                issues.push(format!(
                    "Line {} exceeds {MAX_LINE_LENGTH} characters",
                    i + 1
                ));
            }
        }

        if self.trailing_whitespace.is_match(code) {
            issues.push("Trailing whitespace detected".to_string());
        }

        if self.print_call.is_match(code) {
            issues.push("Consider using logging instead of print statements".to_string());
        }

        issues
    }
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the code with the Python grammar. Returns whether the parse was
/// clean along with a message for the first offending node.
fn validate_syntax(code: &str) -> (bool, Vec<String>) {
    let mut parser = tree_sitter::Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        return (false, vec![format!("Parse error: {e}")]);
    }

    let tree = match parser.parse(code, None) {
        Some(tree) => tree,
        None => return (false, vec!["Parse error: parser produced no tree".to_string()]),
    };

    let root = tree.root_node();
    if !root.has_error() {
        return (true, Vec::new());
    }

    let message = match first_error_node(root) {
        Some(node) => {
            let line = node.start_position().row + 1;
            if node.is_missing() {
                format!("Syntax error at line {line}: missing {}", node.kind())
            } else {
                format!("Syntax error at line {line}: invalid syntax")
            }
        }
        None => "Syntax error: invalid syntax".to_string(),
    };

    (false, vec![message])
}

fn first_error_node(root: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    let mut cursor = root.walk();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        if node.has_error() {
            // Push children in reverse so the earliest child is visited first
            let children: Vec<_> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                stack.push(child);
            }
        }
    }

    None
}

fn validate_pyspark_imports(code: &str) -> Vec<String> {
    let mut issues = Vec::new();
    if !code.contains("from pyspark.sql") && !code.contains("import pyspark") {
        issues.push("Missing PySpark imports".to_string());
    }
    issues
}

fn best_practice_warnings(code: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    if !code.contains("SparkSession") && !code.to_lowercase().contains("spark") {
        warnings.push("No SparkSession found - ensure Spark context is created".to_string());
    }

    if !code.contains("try:") && !code.contains("except") {
        warnings.push("Consider adding error handling (try/except blocks)".to_string());
    }

    if !code.contains("logging") && !code.to_lowercase().contains("logger") {
        warnings.push("Consider adding logging for better observability".to_string());
    }

    if !code.contains("\"\"\"") && !code.contains("'''") {
        warnings.push("Consider adding docstrings to functions/classes".to_string());
    }

    warnings
}
