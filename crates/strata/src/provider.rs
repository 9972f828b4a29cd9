// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Computed fallback values for keys no layer holds.
//!
//! A [`ValueProviderRegistry`] routes a key to the provider registered under the prefix
//! the key starts with. Registered prefixes never overlap, so at most one provider can
//! match any key. The registry keeps no results of its own: the cache writes whatever a
//! provider returns into its layers, and the next read is served from there.

use std::{fmt::Debug, sync::Arc};

use futures::future::{BoxFuture, try_join_all};
use strata_backend::Error;

/// Computes values for the keys under one prefix.
///
/// Implement this for providers that need state or can fail; for plain closures use
/// [`provider_fn`].
#[dynosaur::dynosaur(pub(crate) DynValueProvider = dyn(box) ValueProvider, bridge(none))]
pub trait ValueProvider<V>: Send + Sync {
    /// Computes the value for `key`, or `None` if there is none.
    fn get_item(&self, key: &str) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Reports whether a value exists for `key`.
    fn has_item(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;
}

type GetFn<V> = Arc<dyn Fn(String) -> BoxFuture<'static, Option<V>> + Send + Sync>;
type HasFn = Arc<dyn Fn(String) -> BoxFuture<'static, bool> + Send + Sync>;

/// A [`ValueProvider`] built from closures.
///
/// Without [`with_has`](Self::with_has), `has_item` calls the getter and reports whether
/// it produced a value.
pub struct FnValueProvider<V> {
    get: GetFn<V>,
    has: Option<HasFn>,
}

/// Creates a [`FnValueProvider`] from an async getter.
///
/// # Examples
///
/// ```
/// use strata::{StorageValue, provider_fn};
///
/// let provider = provider_fn(|key: String| async move {
///     key.strip_prefix("echo:").map(StorageValue::from)
/// })
/// .with_has(|key: String| async move { key.starts_with("echo:") });
/// # let _ = provider;
/// ```
pub fn provider_fn<V, F, Fut>(get: F) -> FnValueProvider<V>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<V>> + Send + 'static,
{
    FnValueProvider {
        get: Arc::new(move |key| Box::pin(get(key))),
        has: None,
    }
}

impl<V> FnValueProvider<V> {
    /// Sets a dedicated presence check.
    #[must_use]
    pub fn with_has<F, Fut>(mut self, has: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.has = Some(Arc::new(move |key| Box::pin(has(key))));
        self
    }
}

impl<V> Clone for FnValueProvider<V> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
            has: self.has.clone(),
        }
    }
}

impl<V> Debug for FnValueProvider<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnValueProvider")
            .field("has", &self.has.is_some())
            .finish_non_exhaustive()
    }
}

impl<V> ValueProvider<V> for FnValueProvider<V>
where
    V: Send,
{
    async fn get_item(&self, key: &str) -> Result<Option<V>, Error> {
        Ok((self.get)(key.to_owned()).await)
    }

    async fn has_item(&self, key: &str) -> Result<bool, Error> {
        match &self.has {
            Some(has) => Ok(has(key.to_owned()).await),
            None => Ok((self.get)(key.to_owned()).await.is_some()),
        }
    }
}

/// Prefix-routed fallback providers.
///
/// # Examples
///
/// ```
/// use strata::{StorageValue, ValueProviderRegistry, provider_fn};
/// # futures::executor::block_on(async {
///
/// let mut registry = ValueProviderRegistry::<StorageValue>::new();
/// registry.add("token:", provider_fn(|key: String| async move { Some(StorageValue::from(key)) }))?;
///
/// // overlapping prefixes are rejected
/// assert!(registry.add("token:session:", provider_fn(|_key: String| async { None })).is_err());
///
/// assert_eq!(registry.get_item("token:abc").await?, Some(StorageValue::from("token:abc")));
/// assert_eq!(registry.get_item("user:1").await?, None);
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct ValueProviderRegistry<V> {
    providers: Vec<(String, Arc<DynValueProvider<'static, V>>)>,
}

impl<V> Default for ValueProviderRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ValueProviderRegistry<V> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    /// Returns the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Returns `true` if no provider is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Iterates over the registered prefixes in registration order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|(prefix, _)| prefix.as_str())
    }

    /// Registers `provider` for every key starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, and leaves the registry unchanged, if `prefix` equals
    /// a registered prefix, starts with one, or is the start of one.
    pub fn add<P>(&mut self, prefix: impl Into<String>, provider: P) -> Result<(), Error>
    where
        P: ValueProvider<V> + 'static,
    {
        let prefix = prefix.into();
        self.check_overlap(&prefix)?;
        self.providers.push((prefix, DynValueProvider::new_arc(provider)));
        Ok(())
    }

    fn check_overlap(&self, prefix: &str) -> Result<(), Error> {
        let issues: Vec<String> = self
            .providers
            .iter()
            .map(|(existing, _)| existing.as_str())
            .filter_map(|existing| {
                if existing == prefix {
                    Some(format!(" - \"{prefix}\" is already registered"))
                } else if prefix.starts_with(existing) {
                    Some(format!(" - \"{existing}\" is less specific than \"{prefix}\""))
                } else if existing.starts_with(prefix) {
                    Some(format!(" - \"{prefix}\" is less specific than \"{existing}\""))
                } else {
                    None
                }
            })
            .collect();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "value provider prefixes must not overlap:\n{}",
                issues.join("\n")
            )))
        }
    }

    fn route(&self, key: &str) -> Option<&DynValueProvider<'static, V>> {
        self.providers
            .iter()
            .find(|(prefix, _)| key.starts_with(prefix.as_str()))
            .map(|(_, provider)| &**provider)
    }

    /// Computes the value for `key` from the matching provider.
    ///
    /// Returns `None` when no prefix matches.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn get_item(&self, key: &str) -> Result<Option<V>, Error> {
        match self.route(key) {
            Some(provider) => provider.get_item(key).await,
            None => Ok(None),
        }
    }

    /// Reports whether the matching provider has a value for `key`.
    ///
    /// Returns `false` when no prefix matches.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn has_item(&self, key: &str) -> Result<bool, Error> {
        match self.route(key) {
            Some(provider) => provider.has_item(key).await,
            None => Ok(false),
        }
    }

    /// Computes values for many keys concurrently. The result is aligned with `keys`.
    ///
    /// # Errors
    ///
    /// Fails with the first provider error.
    pub async fn get_items(&self, keys: &[String]) -> Result<Vec<Option<V>>, Error> {
        try_join_all(keys.iter().map(|key| self.get_item(key))).await
    }

    /// Checks many keys concurrently. The result is aligned with `keys`.
    ///
    /// # Errors
    ///
    /// Fails with the first provider error.
    pub async fn has_items(&self, keys: &[String]) -> Result<Vec<bool>, Error> {
        try_join_all(keys.iter().map(|key| self.has_item(key))).await
    }
}

impl<V> Debug for ValueProviderRegistry<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.prefixes()).finish()
    }
}
