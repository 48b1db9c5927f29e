// Application configuration.
// Reads GitHub credentials, endpoint bases, and cache timeouts from the environment.

use std::fmt;
use std::time::Duration;

use crate::error::{LulzError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.github.com/";
pub const DEFAULT_RAW_BASE: &str = "https://raw.githubusercontent.com";
pub const DEFAULT_PICS_REPO: &str = "lulz-pics";
pub const DEFAULT_COMMIT_LIMIT: usize = 100;

/// How requests authenticate against GitHub.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Session-scoped OAuth access token.
    Token(String),
    /// OAuth application credentials.
    App {
        client_id: String,
        client_secret: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::App { client_id, .. } => f
                .debug_struct("App")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Cache timeouts for each memoized call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheTimeouts {
    pub commits: Duration,
    pub branches: Duration,
    pub default_branch: Duration,
    pub pictures: Duration,
    pub user_repos: Duration,
    pub user_profile: Duration,
}

impl Default for CacheTimeouts {
    fn default() -> Self {
        Self {
            commits: Duration::from_secs(5 * 60),
            branches: Duration::from_secs(5 * 60),
            default_branch: Duration::from_secs(10 * 60),
            pictures: Duration::from_secs(5 * 60),
            user_repos: Duration::from_secs(2 * 60),
            user_profile: Duration::from_secs(2 * 60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL that relative API endpoints resolve against.
    pub api_base: String,
    /// Base URL for raw file contents.
    pub raw_base: String,
    /// Name of the repository each user keeps pictures in.
    pub pics_repo: String,
    pub credentials: Option<Credentials>,
    pub user_agent: String,
    /// Most commits shown for one history.
    pub commit_limit: usize,
    pub timeouts: CacheTimeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            raw_base: DEFAULT_RAW_BASE.to_string(),
            pics_repo: DEFAULT_PICS_REPO.to_string(),
            credentials: None,
            user_agent: concat!("lulz-history/", env!("CARGO_PKG_VERSION")).to_string(),
            commit_limit: DEFAULT_COMMIT_LIMIT,
            timeouts: CacheTimeouts::default(),
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from any variable lookup.
    ///
    /// `GITHUB_TOKEN` wins over `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET`,
    /// which must be set together.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        config.credentials = match (
            var("GITHUB_TOKEN"),
            var("GITHUB_CLIENT_ID"),
            var("GITHUB_CLIENT_SECRET"),
        ) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(client_id), Some(client_secret)) => Some(Credentials::App {
                client_id,
                client_secret,
            }),
            (None, None, None) => None,
            (None, _, _) => {
                return Err(LulzError::Config(
                    "GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET must be set together".to_string(),
                ));
            }
        };

        if let Some(base) = var("LULZ_API_BASE") {
            config.api_base = base;
        }
        if let Some(base) = var("LULZ_RAW_BASE") {
            config.raw_base = base;
        }
        if let Some(repo) = var("LULZ_PICS_REPO") {
            config.pics_repo = repo;
        }
        if let Some(limit) = var("LULZ_COMMIT_LIMIT") {
            config.commit_limit = limit.trim().parse().map_err(|_| {
                LulzError::Config(format!("LULZ_COMMIT_LIMIT is not a number: {limit}"))
            })?;
        }

        Ok(config)
    }

    /// The same configuration, authenticating with a session token.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            credentials: Some(Credentials::Token(token.into())),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.pics_repo, "lulz-pics");
        assert_eq!(config.credentials, None);
        assert_eq!(config.timeouts.default_branch, Duration::from_secs(600));
    }

    #[test]
    fn test_app_credentials() {
        let config = Config::from_lookup(lookup(&[
            ("GITHUB_CLIENT_ID", "id"),
            ("GITHUB_CLIENT_SECRET", "secret"),
            ("LULZ_PICS_REPO", "my-pics"),
            ("LULZ_COMMIT_LIMIT", "30"),
        ]))
        .unwrap();

        assert_eq!(
            config.credentials,
            Some(Credentials::App {
                client_id: "id".into(),
                client_secret: "secret".into(),
            })
        );
        assert_eq!(config.pics_repo, "my-pics");
        assert_eq!(config.commit_limit, 30);
    }

    #[test]
    fn test_token_wins() {
        let config = Config::from_lookup(lookup(&[
            ("GITHUB_TOKEN", "tok"),
            ("GITHUB_CLIENT_ID", "id"),
        ]))
        .unwrap();
        assert_eq!(config.credentials, Some(Credentials::Token("tok".into())));
    }

    #[test]
    fn test_half_app_credentials_rejected() {
        let err = Config::from_lookup(lookup(&[("GITHUB_CLIENT_ID", "id")])).unwrap_err();
        assert!(matches!(err, LulzError::Config(_)));
    }

    #[test]
    fn test_bad_commit_limit() {
        let err = Config::from_lookup(lookup(&[("LULZ_COMMIT_LIMIT", "lots")])).unwrap_err();
        assert!(matches!(err, LulzError::Config(_)));
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let debug = format!("{:?}", Config::default().with_token("s3cret").credentials);
        assert!(!debug.contains("s3cret"));
    }
}
