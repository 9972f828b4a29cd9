// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Context-driven key namespacing.
//!
//! A [`NamespaceResolver`] turns caller-owned context (a tenant, a user, a locale) into a
//! prefix that is joined to every key before it reaches the layers. The prefix comes from
//! a user-supplied async provider and is memoized by a hash of the context's current
//! contents, so the provider runs again exactly when the context changes.

use std::{
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::Arc,
};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use strata_backend::{Backend, Error, Options};
use strata_memory::MemoryBackend;
use xxhash_rust::xxh3::Xxh3;

use crate::telemetry::{CacheActivity, CacheOperation, CacheTelemetry};

/// Separator placed between the namespace and the key when none is given.
pub const DEFAULT_SEPARATOR: &str = ":";

/// Caller-owned context a namespace is computed from.
///
/// Clones share the same value: keep one clone, hand another to the cache, and mutate
/// through [`update`](Self::update) or [`replace`](Self::replace). The cache only reads it.
///
/// # Examples
///
/// ```
/// use strata::NamespaceContext;
///
/// let context = NamespaceContext::new(String::from("tenant-a"));
/// let shared = context.clone();
///
/// context.replace(String::from("tenant-b"));
/// assert_eq!(shared.snapshot(), "tenant-b");
/// ```
pub struct NamespaceContext<C>(Arc<RwLock<C>>);

impl<C> NamespaceContext<C> {
    /// Wraps `value` in a shared context.
    pub fn new(value: C) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Mutates the context in place.
    pub fn update(&self, f: impl FnOnce(&mut C)) {
        f(&mut self.0.write());
    }

    /// Replaces the context, returning the previous value.
    pub fn replace(&self, value: C) -> C {
        std::mem::replace(&mut *self.0.write(), value)
    }

    /// Returns a copy of the current value.
    #[must_use]
    pub fn snapshot(&self) -> C
    where
        C: Clone,
    {
        self.0.read().clone()
    }
}

impl<C> Clone for NamespaceContext<C> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<C: Debug> Debug for NamespaceContext<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("NamespaceContext").field(&*self.0.read()).finish()
    }
}

/// A context snapshot, reduced to its memo key plus the deferred provider call.
struct Captured {
    fingerprint: String,
    compute: Box<dyn FnOnce() -> BoxFuture<'static, String> + Send>,
}

trait NamespaceSource: Send + Sync {
    fn capture(&self) -> Captured;
}

struct ContextSource<C, F> {
    context: NamespaceContext<C>,
    provider: Arc<F>,
}

impl<C, F, Fut> NamespaceSource for ContextSource<C, F>
where
    C: Hash + Clone + Send + Sync + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = String> + Send + 'static,
{
    fn capture(&self) -> Captured {
        let snapshot = self.context.snapshot();
        let fingerprint = fingerprint(&snapshot);
        let provider = Arc::clone(&self.provider);
        Captured {
            fingerprint,
            compute: Box::new(move || Box::pin(provider(snapshot))),
        }
    }
}

fn fingerprint<C: Hash>(context: &C) -> String {
    let mut hasher = Xxh3::new();
    context.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Joins a computed namespace to keys.
///
/// Without a provider the resolver is the identity: keys pass through untouched and
/// nothing is hashed or stored.
///
/// # Examples
///
/// ```
/// use strata::{NamespaceContext, NamespaceResolver};
/// # futures::executor::block_on(async {
///
/// let tenant = NamespaceContext::new("acme".to_string());
/// let resolver = NamespaceResolver::new(tenant.clone(), |tenant: String| async move { tenant }, "/");
///
/// assert_eq!(resolver.resolve_one("users").await?, "acme/users");
///
/// tenant.replace("globex".to_string());
/// assert_eq!(resolver.resolve_one("users").await?, "globex/users");
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct NamespaceResolver {
    separator: String,
    source: Option<Arc<dyn NamespaceSource>>,
    memo: MemoryBackend<String>,
    telemetry: CacheTelemetry,
}

impl Default for NamespaceResolver {
    fn default() -> Self {
        Self::identity()
    }
}

impl NamespaceResolver {
    /// Creates a resolver that leaves keys unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_owned(),
            source: None,
            memo: MemoryBackend::new(),
            telemetry: CacheTelemetry::default(),
        }
    }

    /// Creates a resolver that prefixes keys with `provider(context)` and `separator`.
    ///
    /// The provider receives a snapshot of the context. It is called once per distinct
    /// context value; later calls with equal contents reuse the memoized namespace.
    pub fn new<C, F, Fut>(context: NamespaceContext<C>, provider: F, separator: impl Into<String>) -> Self
    where
        C: Hash + Clone + Send + Sync + 'static,
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        Self {
            separator: separator.into(),
            source: Some(Arc::new(ContextSource {
                context,
                provider: Arc::new(provider),
            })),
            memo: MemoryBackend::new(),
            telemetry: CacheTelemetry::default(),
        }
    }

    pub(crate) fn with_telemetry(mut self, telemetry: CacheTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Returns the separator joined between namespace and key.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Returns `true` if no provider is configured.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.source.is_none()
    }

    /// Returns the namespace for the current context, or `None` without a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the memo store fails.
    pub async fn namespace(&self) -> Result<Option<String>, Error> {
        let Some(source) = &self.source else {
            return Ok(None);
        };

        let Captured { fingerprint, compute } = source.capture();
        if let Some(namespace) = self.memo.get_item(&fingerprint, Options::empty()).await? {
            return Ok(Some(namespace));
        }

        let namespace = compute().await;
        self.memo.set_item(&fingerprint, namespace.clone(), Options::empty()).await?;
        self.telemetry.record(CacheOperation::Namespace, CacheActivity::Miss, None, 1);
        Ok(Some(namespace))
    }

    /// Namespaces every key, preserving order.
    ///
    /// # Errors
    ///
    /// Returns an error if the memo store fails.
    pub async fn resolve<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<String>, Error> {
        let namespace = self.namespace().await?;
        Ok(keys.iter().map(|key| self.join(namespace.as_deref(), key.as_ref())).collect())
    }

    /// Namespaces one key.
    ///
    /// # Errors
    ///
    /// Returns an error if the memo store fails.
    pub async fn resolve_one(&self, key: &str) -> Result<String, Error> {
        let namespace = self.namespace().await?;
        Ok(self.join(namespace.as_deref(), key))
    }

    /// Namespaces the key of every pair and leaves values untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the memo store fails.
    pub async fn resolve_pairs<V>(&self, pairs: Vec<(String, V)>) -> Result<Vec<(String, V)>, Error> {
        let Some(namespace) = self.namespace().await? else {
            return Ok(pairs);
        };
        Ok(pairs
            .into_iter()
            .map(|(key, value)| (self.join(Some(&namespace), &key), value))
            .collect())
    }

    /// Resolves a clear prefix.
    ///
    /// `None` becomes the namespace itself (followed by the separator) so a clear never
    /// reaches outside the current namespace. An empty result means "everything".
    pub(crate) async fn resolve_prefix(&self, prefix: Option<&str>) -> Result<Option<String>, Error> {
        let resolved = match (self.namespace().await?, prefix) {
            (None, prefix) => prefix.map(str::to_owned),
            (Some(namespace), prefix) => Some(self.join(Some(&namespace), prefix.unwrap_or_default())),
        };
        Ok(resolved.filter(|prefix| !prefix.is_empty()))
    }

    fn join(&self, namespace: Option<&str>, key: &str) -> String {
        match namespace {
            Some(namespace) => format!("{namespace}{}{key}", self.separator),
            None => key.to_owned(),
        }
    }
}

impl Debug for NamespaceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespaceResolver")
            .field("separator", &self.separator)
            .field("identity", &self.is_identity())
            .finish_non_exhaustive()
    }
}
