// History assembly.
// Combines memoized commit, branch and picture lookups into the lulz'd history of a repository.

mod pictures;
#[cfg(test)]
mod stub;

pub use pictures::{PictureIndex, PicturePolicy, scan_pictures};

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{CacheStore, Cached, CachedBuilder, KeyArgs};
use crate::config::Config;
use crate::error::{LulzError, Result};
use crate::github::{Branch, Commit, GitHubApi, Repository, User};

/// Branch assumed when a repository does not report one.
const FALLBACK_BRANCH: &str = "master";

/// Arguments of per-repository lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoArgs {
    pub owner: String,
    pub repo: String,
}

impl RepoArgs {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }
    }
}

impl KeyArgs for RepoArgs {
    fn key_value(&self, name: &str) -> Option<String> {
        match name {
            "owner" | "0" => Some(self.owner.clone()),
            "repo" | "1" => Some(self.repo.clone()),
            _ => None,
        }
    }
}

/// Arguments of a commit listing. A missing branch renders as empty in keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitArgs {
    pub owner: String,
    pub repo: String,
    pub branch: Option<String>,
}

impl KeyArgs for CommitArgs {
    fn key_value(&self, name: &str) -> Option<String> {
        match name {
            "owner" | "0" => Some(self.owner.clone()),
            "repo" | "1" => Some(self.repo.clone()),
            "branch" | "2" => Some(self.branch.clone().unwrap_or_default()),
            _ => None,
        }
    }
}

/// A user session and the client acting on its behalf.
struct SessionArgs {
    session: String,
    api: Arc<dyn GitHubApi>,
}

impl KeyArgs for SessionArgs {
    fn key_value(&self, name: &str) -> Option<String> {
        matches!(name, "session" | "0").then(|| self.session.clone())
    }
}

/// One row of a history: a commit and what to show next to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub commit: Commit,
    /// The commit's picture, or the author's avatar when it has none.
    pub picture: Option<String>,
    /// Whether `picture` is a real commit picture.
    pub is_lulz: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub repo_name: String,
    pub current_branch: Option<String>,
    pub entries: Vec<HistoryEntry>,
    pub branches: Vec<Branch>,
}

impl History {
    pub fn lulz_count(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_lulz).count()
    }
}

/// Who is looking at the pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub authenticated: bool,
    pub user: Option<User>,
}

impl UserProfile {
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Memoized GitHub lookups behind the history pages.
pub struct HistoryService {
    commits: Cached<CommitArgs, Vec<Commit>, LulzError>,
    branches: Cached<RepoArgs, Vec<Branch>, LulzError>,
    default_branch: Arc<Cached<RepoArgs, String, LulzError>>,
    pictures: Cached<RepoArgs, PictureIndex, LulzError>,
    user_repos: Cached<String, Vec<Repository>, LulzError>,
    profiles: Cached<SessionArgs, UserProfile, LulzError>,
    pics_repo: String,
}

impl HistoryService {
    pub fn new(
        api: Arc<dyn GitHubApi>,
        policy: Arc<dyn PicturePolicy>,
        store: Arc<dyn CacheStore>,
        config: &Config,
    ) -> Result<Self> {
        let timeouts = &config.timeouts;

        let commits: Cached<CommitArgs, Vec<Commit>, LulzError> = {
            let api = api.clone();
            let limit = config.commit_limit;
            CachedBuilder::new(store.clone())
                .timeout(timeouts.commits)
                .key_template("/repos/{owner}/{repo}/commits?sha={branch}")
                .build(move |args: &CommitArgs| {
                    api.commits(&args.owner, &args.repo, args.branch.as_deref(), limit)
                })?
        };

        let branches: Cached<RepoArgs, Vec<Branch>, LulzError> = {
            let api = api.clone();
            CachedBuilder::new(store.clone())
                .timeout(timeouts.branches)
                .key_template("/repos/{owner}/{repo}/branches")
                .build(move |args: &RepoArgs| api.branches(&args.owner, &args.repo))?
        };

        let default_branch: Arc<Cached<RepoArgs, String, LulzError>> = {
            let api = api.clone();
            Arc::new(
                CachedBuilder::new(store.clone())
                    .timeout(timeouts.default_branch)
                    .key_template("repo_master_branch:{owner}/{repo}")
                    .build(move |args: &RepoArgs| {
                        let repository = api.repository(&args.owner, &args.repo)?;
                        Ok(repository
                            .default_branch
                            .unwrap_or_else(|| FALLBACK_BRANCH.to_string()))
                    })?,
            )
        };

        let pictures: Cached<RepoArgs, PictureIndex, LulzError> = {
            let api = api.clone();
            let default_branch = default_branch.clone();
            let raw_base = config.raw_base.clone();
            CachedBuilder::new(store.clone())
                .timeout(timeouts.pictures)
                .key_template("repo_pics:{owner}/{repo}")
                .build(move |args: &RepoArgs| {
                    let branch = match default_branch.call(args) {
                        Ok(branch) => branch,
                        Err(err) => {
                            warn!(
                                owner = %args.owner,
                                repo = %args.repo,
                                error = %err,
                                "picture repository unavailable"
                            );
                            return Ok(PictureIndex::new());
                        }
                    };
                    Ok(scan_pictures(
                        api.as_ref(),
                        policy.as_ref(),
                        &raw_base,
                        &args.owner,
                        &args.repo,
                        &branch,
                    ))
                })?
        };

        let user_repos: Cached<String, Vec<Repository>, LulzError> = CachedBuilder::new(store.clone())
            .timeout(timeouts.user_repos)
            .key_template("/users/{0}/repos")
            .build(move |owner: &String| api.user_repos(owner))?;

        let profiles: Cached<SessionArgs, UserProfile, LulzError> = CachedBuilder::new(store)
            .timeout(timeouts.user_profile)
            .key_template("user_profile:{session}")
            .build(|args: &SessionArgs| {
                Ok(match args.api.current_user() {
                    Ok(user) => UserProfile {
                        authenticated: true,
                        user: Some(user),
                    },
                    Err(err) => {
                        debug!(error = %err, "no authenticated user");
                        UserProfile::anonymous()
                    }
                })
            })?;

        Ok(Self {
            commits,
            branches,
            default_branch,
            pictures,
            user_repos,
            profiles,
            pics_repo: config.pics_repo.clone(),
        })
    }

    /// Repositories of `owner`, most recently updated first.
    pub fn repositories(&self, owner: &str) -> Result<Vec<Repository>> {
        self.user_repos.call(&owner.to_string())
    }

    pub fn branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>> {
        self.branches.call(&RepoArgs::new(owner, repo))
    }

    pub fn default_branch(&self, owner: &str, repo: &str) -> Result<String> {
        self.default_branch.call(&RepoArgs::new(owner, repo))
    }

    /// Pictures kept by `login` in their picture repository.
    pub fn pictures_of(&self, login: &str) -> Result<PictureIndex> {
        self.pictures.call(&RepoArgs::new(login, &self.pics_repo))
    }

    /// Commits of `owner/repo` at `branch`, each paired with its picture.
    pub fn history(&self, owner: &str, repo: &str, branch: Option<&str>) -> Result<History> {
        let commits = self.commits.call(&CommitArgs {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.map(str::to_string),
        })?;
        let branches = self.branches(owner, repo)?;

        let mut pictures: HashMap<String, PictureIndex> = HashMap::new();
        for login in commits.iter().filter_map(Commit::author_login) {
            if !pictures.contains_key(login) {
                pictures.insert(login.to_string(), self.pictures_of(login)?);
            }
        }

        let entries: Vec<HistoryEntry> = commits
            .into_iter()
            .map(|commit| overlay(commit, &pictures))
            .collect();

        let history = History {
            repo_name: format!("{owner}/{repo}"),
            current_branch: branch.map(str::to_string),
            entries,
            branches,
        };
        info!(
            repo = %history.repo_name,
            commits = history.entries.len(),
            lulz = history.lulz_count(),
            "history assembled"
        );
        Ok(history)
    }

    /// Profile of the user behind `session`; unauthenticated on any failure.
    pub fn user_profile(&self, session: &str, api: Arc<dyn GitHubApi>) -> UserProfile {
        let args = SessionArgs {
            session: session.to_string(),
            api,
        };
        self.profiles.call(&args).unwrap_or_else(|err| {
            warn!(error = %err, "user profile lookup failed");
            UserProfile::anonymous()
        })
    }
}

fn overlay(commit: Commit, pictures: &HashMap<String, PictureIndex>) -> HistoryEntry {
    let found = commit
        .author_login()
        .and_then(|login| pictures.get(login))
        .and_then(|index| index.find(&commit.sha))
        .map(str::to_string);

    match found {
        Some(url) => HistoryEntry {
            commit,
            picture: Some(url),
            is_lulz: true,
        },
        None => {
            let avatar = commit
                .author
                .as_ref()
                .and_then(|author| author.avatar_url.clone());
            HistoryEntry {
                commit,
                picture: avatar,
                is_lulz: false,
            }
        }
    }
}
