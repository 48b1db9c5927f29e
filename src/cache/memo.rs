// Memoizing wrapper around fallible computations.
// Results are cached per derived key for a fixed timeout; failures are never stored.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use super::CacheError;
use super::key::{KeyArgs, KeyTemplate};
use super::store::{CacheStore, DEFAULT_TIMEOUT, read_if_valid, write_cached};

type KeyFn<A> = Box<dyn Fn(&A) -> Result<String, CacheError> + Send + Sync>;
type ComputeFn<A, V, E> = Box<dyn Fn(&A) -> Result<V, E> + Send + Sync>;

/// A computation wrapped with a key-based, timeout-based cache.
///
/// `call` has the same input as the wrapped computation. On a hit the
/// computation does not run at all. Concurrent misses on the same key may
/// both compute; the later write wins.
pub struct Cached<A, V, E> {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
    key: KeyFn<A>,
    compute: ComputeFn<A, V, E>,
}

impl<A, V, E> Cached<A, V, E>
where
    A: 'static,
    V: Serialize + DeserializeOwned + 'static,
    E: 'static,
{
    /// Start configuring a wrapper backed by `store`.
    pub fn builder(store: Arc<dyn CacheStore>) -> CachedBuilder<A, V, E> {
        CachedBuilder::new(store)
    }

    /// Run the computation through the cache.
    pub fn call(&self, args: &A) -> Result<V, E>
    where
        E: From<CacheError>,
    {
        let key = (self.key)(args)?;

        if let Some(value) = read_if_valid::<V>(self.store.as_ref(), &key) {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }

        debug!(key = %key, "cache miss");
        let value = (self.compute)(args)?;
        write_cached(self.store.as_ref(), &key, &value, self.timeout);
        Ok(value)
    }

    /// The key `call` would use for `args`.
    pub fn key_for(&self, args: &A) -> Result<String, CacheError> {
        (self.key)(args)
    }

    /// Drop the cached result for `args`, if any.
    pub fn invalidate(&self, args: &A) -> Result<bool, CacheError> {
        let key = (self.key)(args)?;
        Ok(self.store.remove(&key))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<A, V, E> fmt::Debug for Cached<A, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cached")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Cached`].
pub struct CachedBuilder<A, V, E> {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
    key: Option<Result<KeyFn<A>, CacheError>>,
    _result: PhantomData<fn() -> (V, E)>,
}

impl<A: 'static, V, E> CachedBuilder<A, V, E> {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            timeout: DEFAULT_TIMEOUT,
            key: None,
            _result: PhantomData,
        }
    }

    /// How long a computed value stays visible.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Derive keys by filling `template` from the call arguments.
    pub fn key_template(mut self, template: &str) -> Self
    where
        A: KeyArgs,
    {
        self.key = Some(KeyTemplate::parse(template).map(|template| {
            Box::new(move |args: &A| template.render(args)) as KeyFn<A>
        }));
        self
    }

    /// Derive keys with a function of the call arguments.
    pub fn key_with<K>(mut self, key: K) -> Self
    where
        K: Fn(&A) -> String + Send + Sync + 'static,
    {
        let key: KeyFn<A> = Box::new(move |args: &A| Ok(key(args)));
        self.key = Some(Ok(key));
        self
    }

    /// Wrap `compute`.
    ///
    /// Fails when no key strategy was configured or the template is malformed.
    pub fn build<F>(self, compute: F) -> Result<Cached<A, V, E>, CacheError>
    where
        F: Fn(&A) -> Result<V, E> + Send + Sync + 'static,
    {
        let key = self.key.ok_or(CacheError::MissingKeyStrategy)??;
        Ok(Cached {
            store: self.store,
            timeout: self.timeout,
            key,
            compute: Box::new(compute),
        })
    }
}

/// Wrap `compute` with a cache keyed by `template`.
pub fn cached<A, V, E, F>(
    store: Arc<dyn CacheStore>,
    timeout: Duration,
    template: &str,
    compute: F,
) -> Result<Cached<A, V, E>, CacheError>
where
    A: KeyArgs + 'static,
    F: Fn(&A) -> Result<V, E> + Send + Sync + 'static,
{
    CachedBuilder::new(store)
        .timeout(timeout)
        .key_template(template)
        .build(compute)
}
