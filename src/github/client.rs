// GitHub API HTTP client.
// Handles authentication, rate limiting, endpoint resolution, and single-page fetches.

use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::{
    StatusCode,
    blocking::{Client, RequestBuilder, Response},
    header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT},
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::{Config, Credentials};
use crate::error::{LulzError, Result};
use crate::pagination::{Page, traverse, traverse_collect};

use super::link::next_link;
use super::types::RateLimit;

const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub API client with authentication and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    base: Url,
    credentials: Option<Credentials>,
    rate_limit: Mutex<RateLimit>,
}

impl GitHubClient {
    /// Create a new GitHub client from the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| LulzError::Config(format!("invalid user agent: {e}")))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(LulzError::Api)?;

        Ok(Self {
            client,
            base: parse_base(&config.api_base)?,
            credentials: config.credentials.clone(),
            rate_limit: Mutex::new(RateLimit::default()),
        })
    }

    /// Create a client configured from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(&Config::from_env()?)
    }

    /// A client sharing this one's connection pool but acting for a session token.
    pub fn for_session(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base: self.base.clone(),
            credentials: Some(Credentials::Token(token.into())),
            rate_limit: Mutex::new(RateLimit::default()),
        }
    }

    /// Get the current rate limit information.
    pub fn rate_limit(&self) -> RateLimit {
        self.lock_rate_limit().clone()
    }

    /// Resolve an endpoint against the API base. Absolute URLs are kept as-is.
    pub fn resolve(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base.join(endpoint.trim_start_matches('/'))?)
    }

    /// URL of the first page of a listing, with query parameters applied.
    pub fn start_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = self.resolve(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url.into())
    }

    /// Make a GET request to the GitHub API.
    pub fn get(&self, endpoint: &str) -> Result<Response> {
        let url = self.resolve(endpoint)?;
        let response = self.request(url).send()?;

        let reported = self.update_rate_limit(&response);
        check_response(response, &reported)
    }

    /// Fetch a single page of a listing.
    ///
    /// Non-success statuses come back as failed pages rather than errors;
    /// transport and decoding failures are errors.
    pub fn fetch_page<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>> {
        let url = self.resolve(url)?;
        debug!(url = %url, "GET page");
        let response = self.request(url).send()?;

        self.update_rate_limit(&response);
        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            let message = error_message(&response.text().unwrap_or_default());
            warn!(url = %url, status = status.as_u16(), message = %message, "page request failed");
            return Ok(Page::failed(status.as_u16()));
        }

        let next = next_link(response.headers());
        let items: Vec<T> = response.json()?;
        Ok(Page::new(items, next, status.as_u16()))
    }

    /// Fetch every page of a listing and merge the items.
    pub fn get_all<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let start = self.start_url(endpoint, params)?;
        traverse_collect(|url: &str| self.fetch_page(url), start)
    }

    /// Iterate lazily over the items of a listing, fetching pages as needed.
    pub fn iter_all<'a, T: DeserializeOwned + 'a>(
        &'a self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<impl Iterator<Item = Result<T>> + use<'a, T>> {
        let start = self.start_url(endpoint, params)?;
        Ok(traverse(move |url: &str| self.fetch_page(url), start))
    }

    /// Build a GET request, with credentials only when `url` is on the API origin.
    fn request(&self, url: Url) -> RequestBuilder {
        if url.origin() != self.base.origin() {
            debug!(url = %url, "foreign origin, sending without credentials");
            return self.client.get(url);
        }

        let request = self.client.get(url);
        match &self.credentials {
            Some(Credentials::Token(token)) => request.bearer_auth(token),
            Some(Credentials::App {
                client_id,
                client_secret,
            }) => request.basic_auth(client_id, Some(client_secret)),
            None => request,
        }
    }

    /// Record the rate limit headers of `response` and return what it reported.
    fn update_rate_limit(&self, response: &Response) -> RateLimit {
        let reported = rate_limit_headers(response.headers());

        let mut rate_limit = self.lock_rate_limit();
        if reported.limit.is_some() {
            rate_limit.limit = reported.limit;
        }
        if reported.remaining.is_some() {
            rate_limit.remaining = reported.remaining;
        }
        if reported.reset.is_some() {
            rate_limit.reset = reported.reset;
        }
        reported
    }

    fn lock_rate_limit(&self) -> MutexGuard<'_, RateLimit> {
        self.rate_limit
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Rate limit headers of a single response.
fn rate_limit_headers(headers: &HeaderMap) -> RateLimit {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
    };

    RateLimit {
        limit: header("x-ratelimit-limit"),
        remaining: header("x-ratelimit-remaining"),
        reset: header("x-ratelimit-reset"),
    }
}

/// Check response status and convert errors.
///
/// A 403 is only a rate limit error when the response itself reports no
/// requests remaining.
fn check_response(response: Response, reported: &RateLimit) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let message = error_message(&response.text().unwrap_or_default());
    match status {
        StatusCode::UNAUTHORIZED => Err(LulzError::Unauthorized),
        StatusCode::NOT_FOUND => Err(LulzError::NotFound(url)),
        StatusCode::FORBIDDEN if reported.is_exhausted() => {
            let reset_at = reported
                .reset
                .and_then(|reset| chrono::DateTime::from_timestamp(reset as i64, 0))
                .map(|dt| dt.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Err(LulzError::RateLimited { reset_at })
        }
        status => Err(LulzError::Http {
            status: status.as_u16(),
            message,
        }),
    }
}

/// The API base must end in `/` so endpoints join below it.
fn parse_base(base: &str) -> Result<Url> {
    if base.ends_with('/') {
        Ok(Url::parse(base)?)
    } else {
        Ok(Url::parse(&format!("{base}/"))?)
    }
}

/// GitHub's `message` field when the body is a JSON error, else the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
