// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A single storage level in the cache stack.
//!
//! A [`Layer`] adapts one backend into the batch operations the cache traversal needs.
//! Backends that only implement [`Backend`] get a fan-out adapter that issues one call per
//! key concurrently; backends that implement [`BatchBackend`] have their native multi-key
//! calls forwarded unchanged. The choice is made once, when the layer is constructed.

use std::{fmt::Debug, sync::Arc};

use futures::future::try_join_all;
use strata_backend::{Backend, BatchBackend, Error, Options, Unwatch, WatchCallback};

/// Batch and single-key operations over one backend, erased so the cache can hold
/// layers over different backend types.
#[dynosaur::dynosaur(pub(crate) DynLayerOps = dyn(box) LayerOps, bridge(none))]
pub(crate) trait LayerOps<V>: Send + Sync {
    fn mget(&self, keys: &[String], opts: &Options) -> impl Future<Output = Result<Vec<Option<V>>, Error>> + Send;

    fn mset(&self, pairs: Vec<(String, V)>, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    fn get(&self, key: &str, opts: &Options) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    fn set(&self, key: &str, value: V, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    fn remove(&self, key: &str, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    fn has(&self, key: &str, opts: &Options) -> impl Future<Output = Result<bool, Error>> + Send;

    fn get_keys(&self, prefix: Option<&str>, opts: &Options) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    fn clear(&self, prefix: Option<&str>, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    fn watch(&self, callback: WatchCallback) -> impl Future<Output = Result<Unwatch, Error>> + Send;

    fn unwatch(&self) -> impl Future<Output = Result<(), Error>> + Send;

    fn dispose(&self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Runs batches as concurrent single-key calls. The first failure fails the batch.
struct FanOut<B>(B);

impl<V, B> LayerOps<V> for FanOut<B>
where
    V: Send + Sync,
    B: Backend<V>,
{
    async fn mget(&self, keys: &[String], opts: &Options) -> Result<Vec<Option<V>>, Error> {
        try_join_all(keys.iter().map(|key| self.0.get_item(key, opts))).await
    }

    async fn mset(&self, pairs: Vec<(String, V)>, opts: &Options) -> Result<(), Error> {
        try_join_all(
            pairs
                .into_iter()
                .map(|(key, value)| async move { self.0.set_item(&key, value, opts).await }),
        )
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str, opts: &Options) -> Result<Option<V>, Error> {
        self.0.get_item(key, opts).await
    }

    async fn set(&self, key: &str, value: V, opts: &Options) -> Result<(), Error> {
        self.0.set_item(key, value, opts).await
    }

    async fn remove(&self, key: &str, opts: &Options) -> Result<(), Error> {
        self.0.remove_item(key, opts).await
    }

    async fn has(&self, key: &str, opts: &Options) -> Result<bool, Error> {
        self.0.has_item(key, opts).await
    }

    async fn get_keys(&self, prefix: Option<&str>, opts: &Options) -> Result<Vec<String>, Error> {
        self.0.get_keys(prefix, opts).await
    }

    async fn clear(&self, prefix: Option<&str>, opts: &Options) -> Result<(), Error> {
        self.0.clear(prefix, opts).await
    }

    async fn watch(&self, callback: WatchCallback) -> Result<Unwatch, Error> {
        self.0.watch(callback).await
    }

    async fn unwatch(&self) -> Result<(), Error> {
        self.0.unwatch().await
    }

    async fn dispose(&self) -> Result<(), Error> {
        self.0.dispose().await
    }
}

/// Forwards batches to the backend's own multi-key calls.
struct Native<B>(B);

impl<V, B> LayerOps<V> for Native<B>
where
    V: Send + Sync,
    B: BatchBackend<V>,
{
    async fn mget(&self, keys: &[String], opts: &Options) -> Result<Vec<Option<V>>, Error> {
        self.0.mget(keys, opts).await
    }

    async fn mset(&self, pairs: Vec<(String, V)>, opts: &Options) -> Result<(), Error> {
        self.0.mset(pairs, opts).await
    }

    async fn get(&self, key: &str, opts: &Options) -> Result<Option<V>, Error> {
        self.0.get_item(key, opts).await
    }

    async fn set(&self, key: &str, value: V, opts: &Options) -> Result<(), Error> {
        self.0.set_item(key, value, opts).await
    }

    async fn remove(&self, key: &str, opts: &Options) -> Result<(), Error> {
        self.0.remove_item(key, opts).await
    }

    async fn has(&self, key: &str, opts: &Options) -> Result<bool, Error> {
        self.0.has_item(key, opts).await
    }

    async fn get_keys(&self, prefix: Option<&str>, opts: &Options) -> Result<Vec<String>, Error> {
        self.0.get_keys(prefix, opts).await
    }

    async fn clear(&self, prefix: Option<&str>, opts: &Options) -> Result<(), Error> {
        self.0.clear(prefix, opts).await
    }

    async fn watch(&self, callback: WatchCallback) -> Result<Unwatch, Error> {
        self.0.watch(callback).await
    }

    async fn unwatch(&self) -> Result<(), Error> {
        self.0.unwatch().await
    }

    async fn dispose(&self) -> Result<(), Error> {
        self.0.dispose().await
    }
}

/// One backend in the cache stack.
///
/// Layers are cheap to clone; clones share the backend.
///
/// # Examples
///
/// ```
/// use strata::{Layer, StorageValue};
/// use strata_memory::MemoryBackend;
///
/// let layer = Layer::new(MemoryBackend::<StorageValue>::new()).named("local");
/// assert_eq!(layer.name(), Some("local"));
/// ```
pub struct Layer<V> {
    ops: Arc<DynLayerOps<'static, V>>,
    name: Option<Arc<str>>,
    batched: bool,
}

impl<V> Layer<V>
where
    V: Send + Sync + 'static,
{
    /// Wraps a single-key backend. Batches fan out into concurrent per-key calls.
    pub fn new<B>(backend: B) -> Self
    where
        B: Backend<V> + 'static,
    {
        Self {
            ops: DynLayerOps::new_arc(FanOut(backend)),
            name: None,
            batched: false,
        }
    }

    /// Wraps a backend with native multi-key operations.
    pub fn batched<B>(backend: B) -> Self
    where
        B: BatchBackend<V> + 'static,
    {
        Self {
            ops: DynLayerOps::new_arc(Native(backend)),
            name: None,
            batched: true,
        }
    }
}

impl<V> Layer<V> {
    /// Names the layer. The name shows up as `cache.layer` in log events.
    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the layer name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if batches are forwarded to the backend's native multi-key calls.
    #[must_use]
    pub fn is_batched(&self) -> bool {
        self.batched
    }

    /// Reads many keys. The result is aligned with `keys`.
    ///
    /// # Errors
    ///
    /// Fails with the first backend error.
    pub async fn mget(&self, keys: &[String], opts: &Options) -> Result<Vec<Option<V>>, Error> {
        self.ops.mget(keys, opts).await
    }

    /// Writes many pairs.
    ///
    /// # Errors
    ///
    /// Fails with the first backend error. Writes that already landed stay in place.
    pub async fn mset(&self, pairs: Vec<(String, V)>, opts: &Options) -> Result<(), Error> {
        self.ops.mset(pairs, opts).await
    }

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn get(&self, key: &str, opts: &Options) -> Result<Option<V>, Error> {
        self.ops.get(key, opts).await
    }

    /// Writes one key.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn set(&self, key: &str, value: V, opts: &Options) -> Result<(), Error> {
        self.ops.set(key, value, opts).await
    }

    /// Removes one key.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn remove(&self, key: &str, opts: &Options) -> Result<(), Error> {
        self.ops.remove(key, opts).await
    }

    /// Reports whether the key holds a value.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn has(&self, key: &str, opts: &Options) -> Result<bool, Error> {
        self.ops.has(key, opts).await
    }

    /// Lists keys under `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn get_keys(&self, prefix: Option<&str>, opts: &Options) -> Result<Vec<String>, Error> {
        self.ops.get_keys(prefix, opts).await
    }

    /// Removes keys under `prefix`, or every key.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn clear(&self, prefix: Option<&str>, opts: &Options) -> Result<(), Error> {
        self.ops.clear(prefix, opts).await
    }

    /// Subscribes to the backend's change events.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn watch(&self, callback: WatchCallback) -> Result<Unwatch, Error> {
        self.ops.watch(callback).await
    }

    /// Drops every subscription on the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn unwatch(&self) -> Result<(), Error> {
        self.ops.unwatch().await
    }

    /// Releases the backend's resources.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    pub async fn dispose(&self) -> Result<(), Error> {
        self.ops.dispose().await
    }
}

impl<V> Clone for Layer<V> {
    fn clone(&self) -> Self {
        Self {
            ops: Arc::clone(&self.ops),
            name: self.name.clone(),
            batched: self.batched,
        }
    }
}

impl<V> Debug for Layer<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layer")
            .field("name", &self.name)
            .field("batched", &self.batched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use strata_backend::testing::{BackendOp, MockBackend};
    use strata_backend::StorageValue;

    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn fan_out_mget_issues_one_get_per_key() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::with_data([("a".to_string(), StorageValue::from(1))]);
            let layer = Layer::new(backend.clone());

            let values = layer.mget(&keys(&["a", "b"]), Options::empty()).await.expect("mget failed");

            assert_eq!(values, vec![Some(StorageValue::from(1)), None]);
            let ops = backend.operations();
            assert_eq!(ops.len(), 2);
            assert!(ops.contains(&BackendOp::Get("a".to_string())));
            assert!(ops.contains(&BackendOp::Get("b".to_string())));
            assert!(!layer.is_batched());
        });
    }

    #[test]
    fn fan_out_mset_issues_one_set_per_pair() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::new();
            let layer = Layer::new(backend.clone());

            layer
                .mset(
                    vec![("a".to_string(), StorageValue::from(1)), ("b".to_string(), StorageValue::from(2))],
                    Options::empty(),
                )
                .await
                .expect("mset failed");

            assert_eq!(backend.writes().len(), 2);
            assert_eq!(backend.peek("b"), Some(StorageValue::from(2)));
        });
    }

    #[test]
    fn fan_out_fails_when_any_key_fails() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::new();
            backend.fail_when(|op| matches!(op, BackendOp::Get(key) if key == "bad"));
            let layer = Layer::new(backend);

            let result = layer.mget(&keys(&["ok", "bad"]), Options::empty()).await;
            result.unwrap_err();
        });
    }

    #[test]
    fn batched_layer_forwards_native_calls() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::new();
            let layer = Layer::batched(backend.clone());

            layer
                .mset(vec![("a".to_string(), StorageValue::from(true))], Options::empty())
                .await
                .expect("mset failed");
            let values = layer.mget(&keys(&["a", "b"]), Options::empty()).await.expect("mget failed");

            assert_eq!(values, vec![Some(StorageValue::from(true)), None]);
            assert_eq!(
                backend.operations(),
                vec![
                    BackendOp::MSet(vec![("a".to_string(), StorageValue::from(true))]),
                    BackendOp::MGet(keys(&["a", "b"])),
                ]
            );
            assert!(layer.is_batched());
        });
    }

    #[test]
    fn single_key_operations_reach_backend() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::new();
            let layer = Layer::new(backend.clone()).named("mock");
            let opts = Options::empty();

            layer.set("user:1", StorageValue::from("ada"), opts).await.expect("set failed");
            assert!(layer.has("user:1", opts).await.expect("has failed"));
            assert_eq!(layer.get("user:1", opts).await.expect("get failed"), Some(StorageValue::from("ada")));
            assert_eq!(layer.get_keys(Some("user:"), opts).await.expect("get_keys failed"), keys(&["user:1"]));

            layer.remove("user:1", opts).await.expect("remove failed");
            assert!(!layer.has("user:1", opts).await.expect("has failed"));

            layer.clear(None, opts).await.expect("clear failed");
            layer.dispose().await.expect("dispose failed");
            assert_eq!(backend.operations().last(), Some(&BackendOp::Dispose));
            assert_eq!(layer.name(), Some("mock"));
        });
    }

    #[test]
    fn clones_share_backend() {
        block_on(async {
            let backend = MockBackend::<StorageValue>::new();
            let layer = Layer::new(backend.clone());
            let clone = layer.clone();

            layer.set("k", StorageValue::from(1), Options::empty()).await.expect("set failed");
            assert_eq!(clone.get("k", Options::empty()).await.expect("get failed"), Some(StorageValue::from(1)));
        });
    }

    #[test]
    fn debug_shows_name() {
        let layer = Layer::new(MockBackend::<StorageValue>::new()).named("remote");
        let debug = format!("{layer:?}");
        assert!(debug.contains("remote"));
    }
}
