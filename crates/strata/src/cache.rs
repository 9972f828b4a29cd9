// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The layered cache.
//!
//! Reads walk the layers from shallowest to deepest and stop for each key at the first
//! layer that holds it. Keys no layer holds are offered to the value providers. Whatever
//! a deeper layer or a provider returns is written back into every shallower layer that
//! missed, and those writes finish before the read returns.
//!
//! Writes go to every layer concurrently. The first failure fails the call; writes that
//! already reached other layers are not rolled back.

use std::{fmt::Debug, hash::Hash};

use futures::future::{BoxFuture, try_join_all};
use strata_backend::{Backend, BatchBackend, Error, Options, StorageValue};

use crate::{
    builder::LayeredCacheBuilder,
    layer::Layer,
    namespace::{NamespaceContext, NamespaceResolver},
    provider::{ValueProvider, ValueProviderRegistry},
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry},
};

/// Values found for one batch of keys, plus the promotions the read owes to shallower
/// layers.
struct Traversal<V> {
    values: Vec<Option<V>>,
    backfill: Vec<Backfill<V>>,
}

/// Pairs found below `layer` that `layer` itself missed.
struct Backfill<V> {
    layer: usize,
    pairs: Vec<(String, V)>,
}

/// An ordered stack of backends presented as one key-value store.
///
/// Layer 0 is the shallowest and is read first. Every operation fails with a
/// configuration error while no layer is configured.
///
/// # Examples
///
/// ```
/// use strata::{LayeredCache, StorageValue};
/// use strata_memory::MemoryBackend;
/// # futures::executor::block_on(async {
///
/// let local = MemoryBackend::<StorageValue>::new();
/// let shared = MemoryBackend::<StorageValue>::new();
///
/// let cache = LayeredCache::new().with_layer(local.clone()).with_layer(shared.clone());
///
/// cache.set("greeting", StorageValue::from("hello")).await?;
/// assert_eq!(cache.get("greeting").await?, Some(StorageValue::from("hello")));
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct LayeredCache<V = StorageValue> {
    layers: Vec<Layer<V>>,
    namespace: NamespaceResolver,
    providers: ValueProviderRegistry<V>,
    telemetry: CacheTelemetry,
}

impl<V> Default for LayeredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LayeredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with no layers, no namespace and no value providers.
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(
            Vec::new(),
            NamespaceResolver::identity(),
            ValueProviderRegistry::new(),
            CacheTelemetry::default(),
        )
    }

    /// Creates a builder.
    #[must_use]
    pub fn builder() -> LayeredCacheBuilder<V> {
        LayeredCacheBuilder::new()
    }

    pub(crate) fn from_parts(
        layers: Vec<Layer<V>>,
        namespace: NamespaceResolver,
        providers: ValueProviderRegistry<V>,
        telemetry: CacheTelemetry,
    ) -> Self {
        let mut cache = Self {
            layers: Vec::with_capacity(layers.len()),
            namespace: namespace.with_telemetry(telemetry.clone()),
            providers,
            telemetry,
        };
        for layer in layers {
            cache.push_layer(layer);
        }
        cache
    }

    /// Appends a layer below the existing ones.
    ///
    /// Unnamed layers are named after their position, `layer0` being the shallowest.
    pub fn push_layer(&mut self, layer: Layer<V>) -> &mut Self {
        let layer = match layer.name() {
            Some(_) => layer,
            None => layer.named(format!("layer{}", self.layers.len())),
        };
        self.layers.push(layer);
        self
    }

    /// Appends a single-key backend as the deepest layer.
    pub fn add_layer<B>(&mut self, backend: B) -> &mut Self
    where
        B: Backend<V> + 'static,
    {
        self.push_layer(Layer::new(backend))
    }

    /// Appends a backend with native multi-key operations as the deepest layer.
    pub fn add_batched_layer<B>(&mut self, backend: B) -> &mut Self
    where
        B: BatchBackend<V> + 'static,
    {
        self.push_layer(Layer::batched(backend))
    }

    /// Builds an in-memory backend from `options` and appends it as the deepest layer.
    ///
    /// The layer takes the backend's name, if it has one.
    #[cfg(feature = "memory")]
    pub fn add_memory_layer(&mut self, options: strata_memory::MemoryBackendBuilder<V>) -> &mut Self {
        let backend = options.build();
        let layer = match backend.name().map(str::to_owned) {
            Some(name) => Layer::new(backend).named(name),
            None => Layer::new(backend),
        };
        self.push_layer(layer)
    }

    /// Appends a single-key backend and returns the cache, for chaining.
    #[must_use]
    pub fn with_layer<B>(mut self, backend: B) -> Self
    where
        B: Backend<V> + 'static,
    {
        self.add_layer(backend);
        self
    }

    /// Namespaces every key with `provider(context)` followed by `separator`.
    ///
    /// Replaces any namespace set before.
    pub fn set_namespace<C, F, Fut>(&mut self, context: NamespaceContext<C>, provider: F, separator: impl Into<String>) -> &mut Self
    where
        C: Hash + Clone + Send + Sync + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.namespace = NamespaceResolver::new(context, provider, separator).with_telemetry(self.telemetry.clone());
        self
    }

    /// Registers a fallback provider for keys starting with `prefix`.
    ///
    /// Providers see fully namespaced keys.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `prefix` overlaps a registered prefix. The
    /// registry is left unchanged.
    pub fn add_value_provider<P>(&mut self, prefix: impl Into<String>, provider: P) -> Result<&mut Self, Error>
    where
        P: ValueProvider<V> + 'static,
    {
        self.providers.add(prefix, provider)?;
        self.telemetry.record(CacheOperation::Provider, CacheActivity::Registered, None, 1);
        Ok(self)
    }

    /// Returns the layers, shallowest first.
    #[must_use]
    pub fn layers(&self) -> &[Layer<V>] {
        &self.layers
    }

    /// Returns the number of layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Returns the namespace resolver.
    #[must_use]
    pub fn namespace(&self) -> &NamespaceResolver {
        &self.namespace
    }

    /// Returns the value provider registry.
    #[must_use]
    pub fn value_providers(&self) -> &ValueProviderRegistry<V> {
        &self.providers
    }

    /// Returns the name used in log events.
    #[must_use]
    pub fn name(&self) -> &str {
        self.telemetry.name()
    }

    fn configured_layers(&self) -> Result<&[Layer<V>], Error> {
        if self.layers.is_empty() {
            return Err(Error::configuration("at least one layer should be configured"));
        }
        Ok(&self.layers)
    }

    /// Reads one key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend or provider error.
    pub async fn get(&self, key: &str) -> Result<Option<V>, Error> {
        Ok(self.mget(&[key]).await?.into_iter().next().flatten())
    }

    /// Reports whether a key resolves to a value, promoting it like [`get`](Self::get).
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend or provider error.
    pub async fn contains(&self, key: &str) -> Result<bool, Error> {
        Ok(self.get(key).await?.is_some())
    }

    /// Writes one key to every layer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn set(&self, key: &str, value: V) -> Result<(), Error> {
        self.mset([(key, value)]).await
    }

    /// Refreshes one key from the deepest layer into every other layer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn sync(&self, key: &str) -> Result<Option<V>, Error> {
        Ok(self.msync(&[key]).await?.into_iter().next().flatten())
    }

    /// Reads many keys. The result is aligned with `keys`.
    ///
    /// Each key is served by the shallowest layer that holds it, then by a value provider.
    /// Values found deeper are written back into the shallower layers that missed them
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend or provider error.
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<V>>, Error> {
        self.configured_layers()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let keys = self.namespace.resolve(keys).await?;
        let Traversal { values, backfill } = self.traverse(0, &keys).await?;
        self.apply_backfill(backfill).await?;
        Ok(values)
    }

    fn traverse<'a>(&'a self, index: usize, keys: &'a [String]) -> BoxFuture<'a, Result<Traversal<V>, Error>> {
        Box::pin(async move {
            let Some(layer) = self.layers.get(index) else {
                let values = self.providers.get_items(keys).await?;
                let computed = values.iter().filter(|value| value.is_some()).count();
                if computed > 0 {
                    self.telemetry.record(CacheOperation::Get, CacheActivity::Fallback, None, computed);
                }
                return Ok(Traversal {
                    values,
                    backfill: Vec::new(),
                });
            };

            let mut values = match layer.mget(keys, Options::empty()).await {
                Ok(values) => values,
                Err(e) => {
                    self.telemetry.record(CacheOperation::Get, CacheActivity::Error, layer.name(), keys.len());
                    return Err(e);
                }
            };

            let (positions, missing): (Vec<usize>, Vec<String>) = values
                .iter()
                .zip(keys)
                .enumerate()
                .filter(|(_, (value, _))| value.is_none())
                .map(|(position, (_, key))| (position, key.clone()))
                .unzip();

            let hits = keys.len() - missing.len();
            if hits > 0 {
                self.telemetry.record(CacheOperation::Get, CacheActivity::Hit, layer.name(), hits);
            }
            if missing.is_empty() {
                return Ok(Traversal {
                    values,
                    backfill: Vec::new(),
                });
            }
            self.telemetry.record(CacheOperation::Get, CacheActivity::Miss, layer.name(), missing.len());

            let deeper = self.traverse(index + 1, &missing).await?;
            let mut backfill = deeper.backfill;
            let mut pairs = Vec::new();
            for ((position, key), value) in positions.into_iter().zip(missing).zip(deeper.values) {
                if let Some(value) = value {
                    values[position] = Some(value.clone());
                    pairs.push((key, value));
                }
            }

            if !pairs.is_empty() {
                backfill.push(Backfill { layer: index, pairs });
            }

            Ok(Traversal { values, backfill })
        })
    }

    async fn apply_backfill(&self, backfill: Vec<Backfill<V>>) -> Result<(), Error> {
        if backfill.is_empty() {
            return Ok(());
        }

        try_join_all(backfill.into_iter().filter_map(|Backfill { layer, pairs }| {
            let layer = self.layers.get(layer)?;
            let count = pairs.len();
            Some(async move {
                let result = layer.mset(pairs, Options::empty()).await;
                let activity = if result.is_ok() { CacheActivity::Promotion } else { CacheActivity::Error };
                self.telemetry.record(CacheOperation::Get, activity, layer.name(), count);
                result
            })
        }))
        .await?;
        Ok(())
    }

    /// Writes many pairs to every layer concurrently.
    ///
    /// Accepts anything that yields `(key, value)` pairs, so a map and a list of pairs
    /// produce the same state.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error. Layers
    /// written before the failure keep their writes.
    pub async fn mset<I, K>(&self, pairs: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        let layers = self.configured_layers()?;
        let pairs: Vec<(String, V)> = pairs.into_iter().map(|(key, value)| (key.into(), value)).collect();
        if pairs.is_empty() {
            return Ok(());
        }

        let pairs = self.namespace.resolve_pairs(pairs).await?;
        let count = pairs.len();
        self.for_each_layer(layers, CacheOperation::Set, count, |layer| {
            let pairs = pairs.clone();
            async move { layer.mset(pairs, Options::empty()).await }
        })
        .await
    }

    /// Reads keys from the deepest layer only and writes what it holds into every other
    /// layer. The result is aligned with `keys` and includes keys the deepest layer lacks.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn msync<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<V>>, Error> {
        let layers = self.configured_layers()?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let Some((deepest, shallower)) = layers.split_last() else {
            return Ok(Vec::new());
        };

        let keys = self.namespace.resolve(keys).await?;
        let values = deepest.mget(&keys, Options::empty()).await?;
        let pairs: Vec<(String, V)> = keys
            .into_iter()
            .zip(&values)
            .filter_map(|(key, value)| value.clone().map(|value| (key, value)))
            .collect();

        if !pairs.is_empty() && !shallower.is_empty() {
            let count = pairs.len();
            self.for_each_layer(shallower, CacheOperation::Sync, count, |layer| {
                let pairs = pairs.clone();
                async move { layer.mset(pairs, Options::empty()).await }
            })
            .await?;
        }

        Ok(values)
    }

    /// Removes one key from every layer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn remove(&self, key: &str) -> Result<(), Error> {
        self.mremove(&[key]).await
    }

    /// Removes many keys from every layer concurrently.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn mremove<K: AsRef<str>>(&self, keys: &[K]) -> Result<(), Error> {
        let layers = self.configured_layers()?;
        if keys.is_empty() {
            return Ok(());
        }

        let keys = self.namespace.resolve(keys).await?;
        let keys = &keys;
        self.for_each_layer(layers, CacheOperation::Remove, keys.len(), |layer| async move {
            try_join_all(keys.iter().map(|key| layer.remove(key, Options::empty())))
                .await
                .map(|_| ())
        })
        .await
    }

    /// Removes every key under `prefix` from every layer.
    ///
    /// The prefix is namespaced like a key. With a namespace and no prefix, only the
    /// current namespace is cleared.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn clear(&self, prefix: Option<&str>, opts: &Options) -> Result<(), Error> {
        let layers = self.configured_layers()?;
        let prefix = self.namespace.resolve_prefix(prefix).await?;
        let prefix = prefix.as_deref();
        self.for_each_layer(layers, CacheOperation::Clear, 0, |layer| layer.clear(prefix, opts))
            .await
    }

    /// Disposes every layer concurrently.
    ///
    /// # Errors
    ///
    /// Returns a configuration error without layers, or the first backend error.
    pub async fn dispose(&self) -> Result<(), Error> {
        let layers = self.configured_layers()?;
        self.for_each_layer(layers, CacheOperation::Dispose, 0, Layer::dispose).await
    }

    /// Runs `op` on every layer concurrently, failing with the first error.
    async fn for_each_layer<'a, F, Fut>(&self, layers: &'a [Layer<V>], operation: CacheOperation, keys: usize, op: F) -> Result<(), Error>
    where
        F: Fn(&'a Layer<V>) -> Fut,
        Fut: Future<Output = Result<(), Error>>,
    {
        let op = &op;
        try_join_all(layers.iter().map(|layer| async move {
            let result = op(layer).await;
            let activity = match (&result, operation) {
                (Err(_), _) => CacheActivity::Error,
                (Ok(()), CacheOperation::Sync) => CacheActivity::Synced,
                (Ok(()), _) => CacheActivity::Ok,
            };
            self.telemetry.record(operation, activity, layer.name(), keys);
            result
        }))
        .await?;
        Ok(())
    }
}

impl<V> Debug for LayeredCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredCache")
            .field("name", &self.telemetry.name())
            .field("logs", &self.telemetry.logs_enabled())
            .field("layers", &self.layers)
            .field("namespace", &self.namespace)
            .field("providers", &self.providers)
            .finish()
    }
}
