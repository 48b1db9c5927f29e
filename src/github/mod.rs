// GitHub API module.
// Provides the client, response types, and the API seam the history views depend on.

pub mod client;
pub mod endpoints;
pub mod link;
pub mod types;

pub use client::GitHubClient;
pub use endpoints::contents_endpoint;
pub use types::*;

use crate::error::Result;

/// The GitHub operations the history assembly needs.
///
/// Implemented by [`GitHubClient`]; tests substitute canned data.
pub trait GitHubApi: Send + Sync {
    fn current_user(&self) -> Result<User>;

    fn repository(&self, owner: &str, repo: &str) -> Result<Repository>;

    fn user_repos(&self, owner: &str) -> Result<Vec<Repository>>;

    /// Up to `limit` commits, newest first.
    fn commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Commit>>;

    fn branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>>;

    /// Directory listing at an endpoint path or a directory entry's `url`.
    fn contents(&self, url: &str) -> Result<Vec<ContentItem>>;
}
