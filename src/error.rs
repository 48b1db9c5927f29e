// Error types for lulz-history.
// Covers GitHub API failures, cache configuration errors, and failed page traversals.

use thiserror::Error;

use crate::cache::CacheError;
use crate::pagination::FetchError;

#[derive(Error, Debug)]
pub enum LulzError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Authentication failed: invalid or expired token")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded, resets at {reset_at}")]
    RateLimited { reset_at: String },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Bad repo name: {0}")]
    BadRepoName(String),

    #[error("{0}")]
    Other(String),
}

impl LulzError {
    /// HTTP status behind this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            LulzError::Unauthorized => Some(401),
            LulzError::NotFound(_) => Some(404),
            LulzError::RateLimited { .. } => Some(403),
            LulzError::Http { status, .. } => Some(*status),
            LulzError::Fetch(err) => Some(err.status),
            LulzError::Api(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, LulzError>;
