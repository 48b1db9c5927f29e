// GitHub API response types.
// Defines structs for deserializing GitHub REST API responses.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LulzError;

/// Owner type discriminator (user or organization).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OwnerType {
    #[default]
    User,
    Organization,
    Bot,
    #[serde(other)]
    Unknown,
}

/// GitHub user or organization, as embedded in other resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub id: u64,
    pub login: String,
    #[serde(rename = "type", default)]
    pub owner_type: OwnerType,
    pub avatar_url: Option<String>,
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

/// GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: Owner,
    pub private: bool,
    pub description: Option<String>,
    pub default_branch: Option<String>,
    pub html_url: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// A commit as returned by the commits listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    /// GitHub account of the author; `None` when the email is not linked to one.
    pub author: Option<Owner>,
    pub commit: CommitDetail,
    pub html_url: Option<String>,
}

impl Commit {
    pub fn author_login(&self) -> Option<&str> {
        self.author.as_ref().map(|author| author.login.as_str())
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.commit.message.lines().next().unwrap_or_default()
    }
}

/// Git-level commit data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: Option<Signature>,
}

/// Name, email and date of a git author or committer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Repository branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub commit: BranchHead,
    #[serde(default)]
    pub protected: bool,
}

/// Commit at the tip of a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchHead {
    pub sha: String,
    pub url: Option<String>,
}

/// Entry of a directory listing from the contents API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
    /// API URL of this entry; for directories, its listing.
    pub url: String,
    pub download_url: Option<String>,
}

/// Kind of a contents entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Unknown,
}

/// Rate limit information from response headers.
///
/// Fields stay `None` until a response reports them; servers with rate
/// limiting turned off never do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimit {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset: Option<u64>,
}

impl RateLimit {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoSlug {
    type Err = LulzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(LulzError::BadRepoName(s.to_string())),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repo_slug_parse() {
        let slug: RepoSlug = "rshk/lulz-history".parse().unwrap();
        assert_eq!(slug.owner, "rshk");
        assert_eq!(slug.repo, "lulz-history");
        assert_eq!(slug.to_string(), "rshk/lulz-history");
    }

    #[test]
    fn test_repo_slug_rejects_bad_names() {
        for bad in ["", "rshk", "rshk/", "/repo", "a/b/c", "rshk//repo"] {
            assert!(
                matches!(bad.parse::<RepoSlug>(), Err(LulzError::BadRepoName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_commit_without_linked_author() {
        let commit: Commit = serde_json::from_value(json!({
            "sha": "0123456789abcdef0123456789abcdef01234567",
            "author": null,
            "commit": {
                "message": "Fix the thing\n\nLonger explanation",
                "author": {"name": "Someone", "email": "someone@example.com", "date": "2013-06-01T12:00:00Z"}
            },
            "html_url": "https://github.com/rshk/lulz-history/commit/0123456"
        }))
        .unwrap();

        assert_eq!(commit.author_login(), None);
        assert_eq!(commit.summary(), "Fix the thing");
    }

    #[test]
    fn test_content_kind_unknown_values() {
        let item: ContentItem = serde_json::from_value(json!({
            "name": "thing",
            "path": "dir/thing",
            "sha": "abc",
            "type": "something-new",
            "url": "https://api.github.com/repos/o/r/contents/dir/thing",
            "download_url": null
        }))
        .unwrap();
        assert_eq!(item.kind, ContentKind::Unknown);
    }
}
