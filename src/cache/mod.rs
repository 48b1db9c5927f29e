// Cache module for memoizing expensive or rate-limited computations.
// Keeps results in a TTL store shared by every memoized call site.

pub mod clock;
pub mod key;
pub mod memo;
pub mod store;

use thiserror::Error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{KeyArgs, KeyPart, KeyTemplate};
pub use memo::{Cached, CachedBuilder, cached};
pub use store::{CacheStore, CachedData, DEFAULT_TIMEOUT, MemoryStore, read_if_valid, write_cached};

/// Configuration errors raised while deriving cache keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("Unspecified cache key")]
    MissingKeyStrategy,

    #[error("Invalid cache key template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("Cache key template {template:?} has no value for {{{name}}}")]
    UnknownPlaceholder { template: String, name: String },
}
