use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub generation: GenerationConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub datasets: DatasetConfig,
}

#[derive(Deserialize, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

// Manual Debug impl to avoid leaking the API key
impl std::fmt::Debug for GenerationConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationConfig")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Deserialize, Clone)]
pub struct GitHubConfig {
    pub token: String,
    /// Target repository in `owner/name` form.
    pub repo: String,
    #[serde(default = "default_base_branch")]
    pub base_branch: String,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("token", &"[REDACTED]")
            .field("repo", &self.repo)
            .field("base_branch", &self.base_branch)
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    16384
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl AppConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Load from file if specified
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            // Try default paths
            builder = builder.add_source(
                config::File::with_name("pipewright")
                    .required(false),
            );
        }

        // Environment variable overrides with PIPEWRIGHT_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("PIPEWRIGHT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }

    pub fn generation_api_key(&self) -> &str {
        &self.generation.api_key
    }

    pub fn github_token(&self) -> &str {
        &self.github.token
    }
}
