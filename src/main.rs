use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pipewright::config::AppConfig;
use pipewright::dataset::DatasetStore;
use pipewright::generation::ClaudeClient;
use pipewright::platform::github::GitHubPublisher;
use pipewright::workflow::{WorkflowRunner, WorkflowState};

#[derive(Parser)]
#[command(
    name = "pipewright",
    about = "Convert user stories into PySpark pipelines delivered as a pull request"
)]
struct Cli {
    /// User story in natural language
    #[arg(short, long)]
    requirement: Option<String>,

    /// Path to a file containing the user story
    #[arg(short, long)]
    file: Option<String>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let requirement = match (&cli.requirement, &cli.file) {
        (Some(requirement), _) => requirement.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read user story file {path}: {e}"))?,
        (None, None) => {
            anyhow::bail!("Provide a user story with --requirement or --file");
        }
    };

    if requirement.trim().is_empty() {
        anyhow::bail!("User story cannot be empty");
    }

    let config = AppConfig::load(cli.config.as_deref())?;

    tracing::info!(
        repo = %config.github.repo,
        model = %config.generation.model,
        "Starting pipewright workflow"
    );

    let datasets = DatasetStore::load(&config.datasets.data_dir);
    let generator = ClaudeClient::new(
        config.generation_api_key(),
        &config.generation.model,
        config.generation.max_tokens,
    );
    let publisher = GitHubPublisher::new(&config.github)?;

    let runner = WorkflowRunner::new(generator, publisher, datasets);
    let state = runner.run(&requirement).await;

    print_summary(&state);

    if state.error.is_some() {
        std::process::exit(1);
    }

    Ok(())
}

fn print_summary(state: &WorkflowState) {
    println!("\n{}", "=".repeat(80));
    println!("pipewright results");
    println!("{}", "=".repeat(80));

    if let Some(error) = &state.error {
        println!("\nError: {error}");
    }

    if let Some(dataset) = &state.dataset {
        println!("\nDataset detected:");
        println!("   Name: {}", dataset.dataset_name);
        println!("   Domain: {}", dataset.domain);
        println!("   File: {}", dataset.file_path);
    }

    if let Some(pipeline) = &state.pipeline {
        println!("\nPipeline generated:");
        println!("   File: {}", pipeline.file_name);
        println!("   Description: {}", pipeline.description);
    }

    if let Some(tests) = &state.tests {
        println!("\nTests generated:");
        println!("   File: {}", tests.file_name);
        println!("   Description: {}", tests.description);
    }

    if let Some(validation) = &state.validation {
        let status = if validation.is_valid {
            "passed"
        } else {
            "issues found"
        };
        println!("\nValidation: {status}");
        if !validation.syntax_errors.is_empty() {
            println!("   Syntax errors: {}", validation.syntax_errors.len());
        }
        if !validation.lint_issues.is_empty() {
            println!("   Linting issues: {}", validation.lint_issues.len());
        }
        if !validation.warnings.is_empty() {
            println!("   Warnings: {}", validation.warnings.len());
        }
    }

    if let Some(review) = &state.review {
        println!("\nCode review:");
        match review.score {
            Some(score) => println!("   Score: {score}/100"),
            None => println!("   Score: N/A"),
        }
        let status = if review.approved {
            "approved"
        } else {
            "needs improvement"
        };
        println!("   Status: {status}");
        println!("   Suggestions: {}", review.suggestions.len());
        for suggestion in review.suggestions.iter().take(3) {
            println!("     - {suggestion}");
        }
    }

    if let Some(docs) = &state.documentation {
        println!("\nDocumentation generated:");
        println!("   File: {}", docs.file_name);
        println!("   Description: {}", docs.description);
    }

    match &state.pr_url {
        Some(url) => {
            println!("\nPull request created:");
            println!("   URL: {url}");
        }
        None => println!("\nNo PR was created (check logs for details)"),
    }

    println!("\n{}", "=".repeat(80));
}
