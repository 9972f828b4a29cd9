// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for [`LayeredCache`].

use std::{hash::Hash, sync::Arc};

use strata_backend::{Backend, BatchBackend, Error};

use crate::{
    LayeredCache,
    layer::Layer,
    namespace::{NamespaceContext, NamespaceResolver},
    provider::{ValueProvider, ValueProviderRegistry},
    telemetry::CacheTelemetry,
};

const DEFAULT_NAME: &str = "strata";

/// Builder for a [`LayeredCache`].
///
/// Layers are stacked in the order they are added: the first one is the shallowest.
/// Value provider registrations are validated as they are added, and the first
/// rejected one is reported by [`build`](Self::build).
///
/// # Examples
///
/// ```
/// use strata::{LayeredCache, NamespaceContext, StorageValue, provider_fn};
/// use strata_memory::MemoryBackend;
///
/// let tenant = NamespaceContext::new("acme".to_string());
///
/// let cache = LayeredCache::<StorageValue>::builder()
///     .name("sessions")
///     .memory_layer()
///     .layer(MemoryBackend::new())
///     .namespace(tenant, |tenant: String| async move { tenant }, ":")
///     .value_provider("config:", provider_fn(|_key: String| async { Some(StorageValue::from(true)) }))
///     .build()?;
///
/// assert_eq!(cache.layer_count(), 2);
/// # Ok::<(), strata::Error>(())
/// ```
pub struct LayeredCacheBuilder<V> {
    name: Arc<str>,
    logs: bool,
    layers: Vec<Layer<V>>,
    namespace: NamespaceResolver,
    providers: ValueProviderRegistry<V>,
    error: Option<Error>,
}

impl<V> Default for LayeredCacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> LayeredCacheBuilder<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            name: Arc::from(DEFAULT_NAME),
            logs: true,
            layers: Vec::new(),
            namespace: NamespaceResolver::identity(),
            providers: ValueProviderRegistry::new(),
            error: None,
        }
    }

    /// Names the cache in log events.
    #[must_use]
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Turns `cache.event` logging on or off. On by default.
    #[must_use]
    pub fn logs(mut self, enabled: bool) -> Self {
        self.logs = enabled;
        self
    }

    /// Adds a single-key backend as the next, deeper layer.
    #[must_use]
    pub fn layer<B>(mut self, backend: B) -> Self
    where
        B: Backend<V> + 'static,
    {
        self.layers.push(Layer::new(backend));
        self
    }

    /// Adds a backend with native multi-key operations as the next, deeper layer.
    #[must_use]
    pub fn batched_layer<B>(mut self, backend: B) -> Self
    where
        B: BatchBackend<V> + 'static,
    {
        self.layers.push(Layer::batched(backend));
        self
    }

    /// Adds a prepared [`Layer`].
    #[must_use]
    pub fn with_layer(mut self, layer: Layer<V>) -> Self {
        self.layers.push(layer);
        self
    }

    /// Adds an unbounded in-memory layer.
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory_layer(self) -> Self {
        self.memory_layer_with(strata_memory::MemoryBackend::builder())
    }

    /// Adds an in-memory layer built from `options`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use strata::{LayeredCache, StorageValue};
    /// use strata_memory::MemoryBackend;
    ///
    /// let cache = LayeredCache::<StorageValue>::builder()
    ///     .memory_layer_with(MemoryBackend::builder().max_capacity(1_000).time_to_live(Duration::from_secs(30)).name("hot"))
    ///     .build()?;
    ///
    /// assert_eq!(cache.layers()[0].name(), Some("hot"));
    /// # Ok::<(), strata::Error>(())
    /// ```
    #[cfg(feature = "memory")]
    #[must_use]
    pub fn memory_layer_with(mut self, options: strata_memory::MemoryBackendBuilder<V>) -> Self {
        let backend = options.build();
        let layer = match backend.name().map(str::to_owned) {
            Some(name) => Layer::new(backend).named(name),
            None => Layer::new(backend),
        };
        self.layers.push(layer);
        self
    }

    /// Namespaces every key with `provider(context)` followed by `separator`.
    #[must_use]
    pub fn namespace<C, F, Fut>(mut self, context: NamespaceContext<C>, provider: F, separator: impl Into<String>) -> Self
    where
        C: Hash + Clone + Send + Sync + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.namespace = NamespaceResolver::new(context, provider, separator);
        self
    }

    /// Registers a fallback provider for keys starting with `prefix`.
    #[must_use]
    pub fn value_provider<P>(mut self, prefix: impl Into<String>, provider: P) -> Self
    where
        P: ValueProvider<V> + 'static,
    {
        if self.error.is_none()
            && let Err(e) = self.providers.add(prefix, provider)
        {
            self.error = Some(e);
        }
        self
    }

    /// Builds the cache.
    ///
    /// A cache without layers can be built; its operations fail until a layer is added.
    ///
    /// # Errors
    ///
    /// Returns the configuration error of the first rejected value provider.
    pub fn build(self) -> Result<LayeredCache<V>, Error> {
        if let Some(e) = self.error {
            return Err(e);
        }

        Ok(LayeredCache::from_parts(
            self.layers,
            self.namespace,
            self.providers,
            CacheTelemetry::new(self.name, self.logs),
        ))
    }
}

impl<V> std::fmt::Debug for LayeredCacheBuilder<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayeredCacheBuilder")
            .field("name", &self.name)
            .field("logs", &self.logs)
            .field("layers", &self.layers)
            .field("namespace", &self.namespace)
            .field("providers", &self.providers)
            .field("error", &self.error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use strata_backend::StorageValue;
    use strata_backend::testing::MockBackend;

    use super::*;
    use crate::provider::provider_fn;

    #[test]
    fn defaults() {
        let cache = LayeredCache::<StorageValue>::builder().build().expect("build failed");
        assert_eq!(cache.name(), "strata");
        assert_eq!(cache.layer_count(), 0);
        assert!(cache.namespace().is_identity());
        assert!(cache.value_providers().is_empty());
    }

    #[test]
    fn layers_keep_insertion_order() {
        let cache = LayeredCache::<StorageValue>::builder()
            .layer(MockBackend::new())
            .batched_layer(MockBackend::new())
            .with_layer(Layer::new(MockBackend::new()).named("remote"))
            .build()
            .expect("build failed");

        let layers = cache.layers();
        assert_eq!(layers.len(), 3);
        assert!(!layers[0].is_batched());
        assert!(layers[1].is_batched());
        assert_eq!(layers[2].name(), Some("remote"));
    }

    #[test]
    fn first_overlapping_provider_fails_build() {
        let result = LayeredCache::<StorageValue>::builder()
            .layer(MockBackend::new())
            .value_provider("token:", provider_fn(|_key: String| async { None }))
            .value_provider("tok", provider_fn(|_key: String| async { None }))
            .value_provider("user:", provider_fn(|_key: String| async { None }))
            .build();

        let err = result.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("tok"), "{err}");
    }

    #[test]
    fn disjoint_providers_are_all_registered() {
        let cache = LayeredCache::<StorageValue>::builder()
            .value_provider("token:", provider_fn(|_key: String| async { None }))
            .value_provider("user:", provider_fn(|_key: String| async { None }))
            .build()
            .expect("build failed");

        assert_eq!(cache.value_providers().prefixes().collect::<Vec<_>>(), vec!["token:", "user:"]);
    }

    #[test]
    fn name_and_namespace_are_applied() {
        let cache = LayeredCache::<StorageValue>::builder()
            .name("profiles")
            .logs(false)
            .namespace(NamespaceContext::new(7_u8), |n: u8| async move { n.to_string() }, "/")
            .build()
            .expect("build failed");

        assert_eq!(cache.name(), "profiles");
        assert_eq!(cache.namespace().separator(), "/");
        assert!(!cache.namespace().is_identity());
        assert!(format!("{cache:?}").contains("profiles"));
    }

    #[cfg(feature = "memory")]
    #[test]
    fn memory_layers_take_backend_names() {
        let cache = LayeredCache::<StorageValue>::builder()
            .memory_layer_with(strata_memory::MemoryBackend::builder().name("hot"))
            .memory_layer()
            .build()
            .expect("build failed");

        let names: Vec<_> = cache.layers().iter().filter_map(Layer::name).collect();
        assert_eq!(names, vec!["hot", "layer1"]);
    }
}
