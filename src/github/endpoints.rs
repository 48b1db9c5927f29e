// GitHub API endpoint functions.
// Provides typed methods for fetching data from the GitHub REST API.

use crate::error::Result;

use super::GitHubApi;
use super::client::GitHubClient;
use super::types::{Branch, Commit, ContentItem, Repository, User};

/// Commits requested per page.
const COMMITS_PER_PAGE: usize = 100;

impl GitHubClient {
    /// Get the authenticated user.
    pub fn get_current_user(&self) -> Result<User> {
        let response = self.get("/user")?;
        let user: User = response.json()?;
        Ok(user)
    }

    /// Get a specific repository.
    pub fn get_repo(&self, owner: &str, repo: &str) -> Result<Repository> {
        let response = self.get(&format!("/repos/{}/{}", owner, repo))?;
        let repository: Repository = response.json()?;
        Ok(repository)
    }

    /// Get every repository of a user, most recently updated first.
    pub fn get_user_repos(&self, owner: &str) -> Result<Vec<Repository>> {
        let params = [("sort", "updated"), ("direction", "desc")];
        self.get_all(&format!("/users/{}/repos", owner), &params)
    }

    /// Get up to `limit` commits of a repository, newest first.
    ///
    /// `branch` may be a branch name or a commit SHA; `None` means the default branch.
    /// Pages are only fetched until `limit` commits have been read.
    pub fn get_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        let per_page = limit.clamp(1, COMMITS_PER_PAGE).to_string();
        let mut params = vec![("per_page", per_page.as_str())];
        if let Some(branch) = branch {
            params.push(("sha", branch));
        }

        self.iter_all(&format!("/repos/{}/{}/commits", owner, repo), &params)?
            .take(limit)
            .collect()
    }

    /// Get every branch of a repository.
    pub fn get_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        self.get_all(&format!("/repos/{}/{}/branches", owner, repo), &[])
    }

    /// Get a directory listing from the contents API.
    ///
    /// `url` is either an endpoint path or the `url` of a directory entry.
    pub fn get_contents(&self, url: &str) -> Result<Vec<ContentItem>> {
        self.get_all(url, &[])
    }
}

/// Endpoint of a repository's root directory listing.
pub fn contents_endpoint(owner: &str, repo: &str) -> String {
    format!("/repos/{}/{}/contents", owner, repo)
}

impl GitHubApi for GitHubClient {
    fn current_user(&self) -> Result<User> {
        self.get_current_user()
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.get_repo(owner, repo)
    }

    fn user_repos(&self, owner: &str) -> Result<Vec<Repository>> {
        self.get_user_repos(owner)
    }

    fn commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        self.get_commits(owner, repo, branch, limit)
    }

    fn branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        self.get_branches(owner, repo)
    }

    fn contents(&self, url: &str) -> Result<Vec<ContentItem>> {
        self.get_contents(url)
    }
}
