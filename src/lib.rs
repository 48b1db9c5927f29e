// lulz-history: GitHub commit history with joke-picture overlays.
// Exposes the memoizing cache, link-based pagination, the GitHub client and history assembly.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod history;
pub mod pagination;

pub use cache::{CacheError, CacheStore, Cached, CachedBuilder, MemoryStore, cached};
pub use config::{Config, Credentials};
pub use error::{LulzError, Result};
pub use github::{GitHubApi, GitHubClient};
pub use history::{History, HistoryEntry, HistoryService, PictureIndex, PicturePolicy, UserProfile};
pub use pagination::{FetchError, Page, pages, traverse, traverse_collect};
