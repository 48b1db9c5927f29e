// Canned GitHub data for history tests.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::error::{LulzError, Result};
use crate::github::{
    Branch, BranchHead, Commit, CommitDetail, ContentItem, ContentKind, GitHubApi, Owner,
    OwnerType, Repository, User,
};

#[derive(Default)]
pub struct StubApi {
    pub user: Option<User>,
    pub commits: Vec<Commit>,
    pub branches: Vec<Branch>,
    /// Default branch per `owner/repo`; missing repositories are 404s.
    pub repos: HashMap<String, String>,
    /// Directory listings per URL; missing listings are 404s.
    pub contents: HashMap<String, Vec<ContentItem>>,
    calls: Mutex<Vec<String>>,
}

impl StubApi {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl GitHubApi for StubApi {
    fn current_user(&self) -> Result<User> {
        self.record("user".into());
        self.user.clone().ok_or(LulzError::Unauthorized)
    }

    fn repository(&self, owner: &str, repo: &str) -> Result<Repository> {
        self.record(format!("repo {owner}/{repo}"));
        let default_branch = self
            .repos
            .get(&format!("{owner}/{repo}"))
            .ok_or_else(|| LulzError::NotFound(format!("/repos/{owner}/{repo}")))?;
        Ok(Repository {
            id: 1,
            name: repo.to_string(),
            full_name: format!("{owner}/{repo}"),
            owner: owner_named(owner),
            private: false,
            description: None,
            default_branch: Some(default_branch.clone()),
            html_url: None,
            updated_at: Utc::now(),
            pushed_at: None,
        })
    }

    fn user_repos(&self, owner: &str) -> Result<Vec<Repository>> {
        self.record(format!("user_repos {owner}"));
        let repos = self
            .repos
            .keys()
            .filter_map(|slug| slug.split_once('/'))
            .filter(|(repo_owner, _)| *repo_owner == owner)
            .map(|(repo_owner, repo)| self.repository(repo_owner, repo))
            .collect::<Result<Vec<_>>>()?;
        Ok(repos)
    }

    fn commits(
        &self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Commit>> {
        self.record(format!(
            "commits {owner}/{repo}@{}",
            branch.unwrap_or("default")
        ));
        Ok(self.commits.iter().take(limit).cloned().collect())
    }

    fn branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        self.record(format!("branches {owner}/{repo}"));
        Ok(self.branches.clone())
    }

    fn contents(&self, url: &str) -> Result<Vec<ContentItem>> {
        self.record(format!("contents {url}"));
        self.contents
            .get(url)
            .cloned()
            .ok_or_else(|| LulzError::NotFound(url.to_string()))
    }
}

pub fn owner_named(login: &str) -> Owner {
    Owner {
        id: 1,
        login: login.to_string(),
        owner_type: OwnerType::User,
        avatar_url: Some(format!("https://avatars.example/{login}")),
    }
}

pub fn commit(sha: &str, author: Option<&str>) -> Commit {
    Commit {
        sha: sha.to_string(),
        author: author.map(owner_named),
        commit: CommitDetail {
            message: format!("commit {sha}"),
            author: None,
        },
        html_url: None,
    }
}

pub fn branch(name: &str) -> Branch {
    Branch {
        name: name.to_string(),
        commit: BranchHead {
            sha: "0".repeat(40),
            url: None,
        },
        protected: false,
    }
}

pub fn file(path: &str) -> ContentItem {
    item(path, ContentKind::File, &format!("file:{path}"))
}

pub fn dir(path: &str, url: &str) -> ContentItem {
    item(path, ContentKind::Dir, url)
}

fn item(path: &str, kind: ContentKind, url: &str) -> ContentItem {
    let name = path.rsplit('/').next().unwrap_or(path);
    ContentItem {
        name: name.to_string(),
        path: path.to_string(),
        sha: "f00".to_string(),
        kind,
        url: url.to_string(),
        download_url: None,
    }
}

/// Pictures are image files; the key is the file stem.
pub fn stem_policy(item: &ContentItem) -> Option<String> {
    let (stem, ext) = item.name.rsplit_once('.')?;
    matches!(ext, "jpg" | "gif" | "png").then(|| stem.to_string())
}
