pub mod github;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::Result;

/// The external publish capability: hand over a file mapping plus a title and
/// body, get back a reference (URL) to the created change request.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Create a pull request containing the given files.
    ///
    /// `files` maps repository-relative paths to text content.
    async fn create_pr_with_files(
        &self,
        files: &BTreeMap<String, String>,
        title: &str,
        body: &str,
    ) -> Result<String>;
}
