use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use octocrab::Octocrab;

use crate::config::GitHubConfig;
use crate::error::{AppError, Result};
use crate::platform::Publisher;

/// Publishes generated artifacts as a pull request via the GitHub API.
///
/// Files are committed through the contents API on a fresh branch, so no
/// local clone is needed.
pub struct GitHubPublisher {
    config: GitHubConfig,
}

impl GitHubPublisher {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        if config.repo.split('/').count() != 2 {
            return Err(AppError::Config(format!(
                "GitHub repo must be in owner/name form: {}",
                config.repo
            )));
        }
        Ok(Self {
            config: config.clone(),
        })
    }

    fn client(&self) -> Result<Octocrab> {
        Octocrab::builder()
            .personal_token(self.config.token.clone())
            .build()
            .map_err(|e| AppError::GitHubApi(format!("Failed to build octocrab client: {e}")))
    }

    fn parse_repo(&self) -> Result<(&str, &str)> {
        let parts: Vec<&str> = self.config.repo.splitn(2, '/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(AppError::GitHubApi(format!(
                "Invalid repo name: {}",
                self.config.repo
            )));
        }
        Ok((parts[0], parts[1]))
    }

    async fn base_branch_sha(&self, client: &Octocrab, owner: &str, repo: &str) -> Result<String> {
        let url = format!(
            "/repos/{owner}/{repo}/git/ref/heads/{}",
            self.config.base_branch
        );
        let response: serde_json::Value = client
            .get(&url, None::<&()>)
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to resolve base branch: {e}")))?;

        response["object"]["sha"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::GitHubApi("No SHA in base branch response".to_string()))
    }

    async fn create_branch(
        &self,
        client: &Octocrab,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
    ) -> Result<()> {
        let url = format!("/repos/{owner}/{repo}/git/refs");
        let body = serde_json::json!({
            "ref": format!("refs/heads/{branch}"),
            "sha": sha,
        });
        let _: serde_json::Value = client
            .post(&url, Some(&body))
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to create branch {branch}: {e}")))?;
        Ok(())
    }

    async fn commit_file(
        &self,
        client: &Octocrab,
        owner: &str,
        repo: &str,
        branch: &str,
        path: &str,
        content: &str,
    ) -> Result<()> {
        let url = format!("/repos/{owner}/{repo}/contents/{path}");
        let body = serde_json::json!({
            "message": format!("Add {path}"),
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": branch,
        });
        let _: serde_json::Value = client
            .put(&url, Some(&body))
            .await
            .map_err(|e| AppError::GitHubApi(format!("Failed to commit {path}: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl Publisher for GitHubPublisher {
    async fn create_pr_with_files(
        &self,
        files: &BTreeMap<String, String>,
        title: &str,
        body: &str,
    ) -> Result<String> {
        let client = self.client()?;
        let (owner, repo) = self.parse_repo()?;
        let (owner, repo) = (owner.to_string(), repo.to_string());

        let base_sha = self.base_branch_sha(&client, &owner, &repo).await?;
        let branch = branch_name(title);

        tracing::info!(branch = %branch, files = files.len(), "Publishing artifacts");

        self.create_branch(&client, &owner, &repo, &branch, &base_sha)
            .await?;

        for (path, content) in files {
            self.commit_file(&client, &owner, &repo, &branch, path, content)
                .await?;
        }

        let created = client
            .pulls(&owner, &repo)
            .create(title, &branch, &self.config.base_branch)
            .body(body)
            .send()
            .await?;

        let url = created
            .html_url
            .map(|u| u.to_string())
            .unwrap_or_default();

        if url.is_empty() {
            return Err(AppError::Publish(
                "Pull request response contained no URL".to_string(),
            ));
        }

        tracing::info!(url = %url, "Pull request created");
        Ok(url)
    }
}

/// Derive a unique branch name from the PR title.
fn branch_name(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    let slug: String = slug.chars().take(40).collect();
    let slug = slug.trim_matches('-');
    format!("pipewright/{slug}-{}", chrono::Utc::now().timestamp())
}
