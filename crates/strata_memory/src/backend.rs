// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory backend implementation using moka.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use moka::future::Cache;
use parking_lot::Mutex;
use strata_backend::{Backend, Error, Options, Unwatch, WatchCallback, WatchEvent};

use crate::builder::MemoryBackendBuilder;

#[derive(Default)]
struct Watchers {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, WatchCallback)>>,
}

impl Watchers {
    fn add(&self, callback: WatchCallback) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, callback));
        id
    }

    fn remove(&self, id: u64) {
        self.callbacks.lock().retain(|(existing, _)| *existing != id);
    }

    fn notify(&self, event: WatchEvent, key: &str) {
        // Callbacks run outside the lock so they may call back into the backend.
        let callbacks: Vec<WatchCallback> = self.callbacks.lock().iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(event, key);
        }
    }
}

/// An in-memory backend backed by moka.
///
/// This backend provides:
/// - Concurrent access through moka's async cache
/// - Optional capacity limits and TTL/TTI expiration (see [`MemoryBackendBuilder`])
/// - Change notifications through [`Backend::watch`]
///
/// Clones share the same storage.
///
/// # Examples
///
/// ```
/// use strata_backend::{Backend, Options};
/// use strata_memory::MemoryBackend;
/// # futures::executor::block_on(async {
///
/// let backend = MemoryBackend::<i32>::new();
///
/// backend.set_item("key", 42, Options::empty()).await?;
/// let value = backend.get_item("key", Options::empty()).await?;
/// assert_eq!(value, Some(42));
/// # Ok::<(), strata_backend::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<String, V>,
    watchers: Arc<Watchers>,
    name: Option<Arc<str>>,
}

impl<V> std::fmt::Debug for MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("name", &self.name)
            .field("watchers", &self.watchers.callbacks.lock().len())
            .finish_non_exhaustive()
    }
}

impl<V> Default for MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates an unbounded backend without expiration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a backend holding at most `max_capacity` keys.
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self::builder().max_capacity(max_capacity).build()
    }

    /// Creates a builder for configuring a backend.
    #[must_use]
    pub fn builder() -> MemoryBackendBuilder<V> {
        MemoryBackendBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryBackendBuilder<V>) -> Self {
        let mut moka_builder = Cache::builder();

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(ttl) = builder.time_to_live {
            moka_builder = moka_builder.time_to_live(ttl);
        }

        if let Some(tti) = builder.time_to_idle {
            moka_builder = moka_builder.time_to_idle(tti);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            watchers: Arc::default(),
            name: builder.name.as_deref().map(Arc::from),
        }
    }

    /// Returns the configured name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn keys_with_prefix(&self, prefix: Option<&str>) -> Vec<String> {
        let prefix = prefix.unwrap_or_default();
        let mut keys: Vec<String> = self
            .inner
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| (*key).clone())
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl<V> Backend<V> for MemoryBackend<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get_item(&self, key: &str, _opts: &Options) -> Result<Option<V>, Error> {
        Ok(self.inner.get(key).await)
    }

    async fn set_item(&self, key: &str, value: V, _opts: &Options) -> Result<(), Error> {
        self.inner.insert(key.to_owned(), value).await;
        self.watchers.notify(WatchEvent::Update, key);
        Ok(())
    }

    async fn remove_item(&self, key: &str, _opts: &Options) -> Result<(), Error> {
        if self.inner.remove(key).await.is_some() {
            self.watchers.notify(WatchEvent::Remove, key);
        }
        Ok(())
    }

    async fn has_item(&self, key: &str, _opts: &Options) -> Result<bool, Error> {
        Ok(self.inner.contains_key(key))
    }

    async fn get_keys(&self, prefix: Option<&str>, _opts: &Options) -> Result<Vec<String>, Error> {
        Ok(self.keys_with_prefix(prefix))
    }

    async fn clear(&self, prefix: Option<&str>, _opts: &Options) -> Result<(), Error> {
        for key in self.keys_with_prefix(prefix) {
            if self.inner.remove(&key).await.is_some() {
                self.watchers.notify(WatchEvent::Remove, &key);
            }
        }
        Ok(())
    }

    async fn dispose(&self) -> Result<(), Error> {
        self.watchers.callbacks.lock().clear();
        self.inner.invalidate_all();
        Ok(())
    }

    async fn watch(&self, callback: WatchCallback) -> Result<Unwatch, Error> {
        let id = self.watchers.add(callback);
        let watchers = Arc::clone(&self.watchers);
        Ok(Unwatch::new(move || watchers.remove(id)))
    }

    async fn unwatch(&self) -> Result<(), Error> {
        self.watchers.callbacks.lock().clear();
        Ok(())
    }
}
