// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock backend implementation for testing.
//!
//! This module provides `MockBackend`, a configurable in-memory backend that
//! records all operations and supports failure injection for testing error paths.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;

use crate::{Backend, BatchBackend, Error, Options};

/// Recorded backend operation with full context.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendOp<V> {
    /// A single-key read.
    Get(String),
    /// A single-key write.
    Set {
        /// The key that was written.
        key: String,
        /// The value that was written.
        value: V,
    },
    /// A single-key removal.
    Remove(String),
    /// A presence check.
    Has(String),
    /// A key listing under an optional prefix.
    GetKeys(Option<String>),
    /// A clear under an optional prefix.
    Clear(Option<String>),
    /// A native multi-key read.
    MGet(Vec<String>),
    /// A native multi-key write.
    MSet(Vec<(String, V)>),
    /// The backend was disposed.
    Dispose,
}

impl<V> BackendOp<V> {
    /// Returns `true` for operations that mutate the backend.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Set { .. } | Self::Remove(_) | Self::Clear(_) | Self::MSet(_))
    }
}

type FailPredicate<V> = Box<dyn Fn(&BackendOp<V>) -> bool + Send + Sync>;

/// A configurable mock backend for testing.
///
/// This backend stores values in memory and can be configured to fail
/// operations on demand, making it useful for testing error handling paths.
/// All operations are recorded for later verification. Clones share state, so
/// keep a clone to inspect a backend after handing it to a cache.
///
/// `MockBackend` implements both [`Backend`] and [`BatchBackend`]: wrap it as a
/// fan-out layer to observe per-key calls, or as a batched layer to observe
/// [`BackendOp::MGet`] and [`BackendOp::MSet`].
///
/// # Examples
///
/// ```
/// use strata_backend::testing::{BackendOp, MockBackend};
/// use strata_backend::{Backend, Options};
///
/// # futures::executor::block_on(async {
/// let backend = MockBackend::<i32>::new();
///
/// backend.set_item("key", 42, Options::empty()).await.unwrap();
/// let value = backend.get_item("key", Options::empty()).await.unwrap();
/// assert_eq!(value, Some(42));
///
/// assert_eq!(backend.operations(), vec![
///     BackendOp::Set { key: "key".to_string(), value: 42 },
///     BackendOp::Get("key".to_string()),
/// ]);
/// # });
/// ```
///
/// # Failure Injection
///
/// ```
/// use strata_backend::testing::{BackendOp, MockBackend};
/// use strata_backend::{Backend, Options};
///
/// # futures::executor::block_on(async {
/// let backend: MockBackend<i32> = MockBackend::new();
///
/// // Fail only specific keys
/// backend.fail_when(|op| matches!(op, BackendOp::Get(k) if k == "forbidden"));
/// assert!(backend.get_item("forbidden", Options::empty()).await.is_err());
/// assert!(backend.get_item("allowed", Options::empty()).await.is_ok());
/// # });
/// ```
pub struct MockBackend<V> {
    data: Arc<Mutex<HashMap<String, V>>>,
    operations: Arc<Mutex<Vec<BackendOp<V>>>>,
    fail_when: Arc<Mutex<Option<FailPredicate<V>>>>,
}

impl<V> std::fmt::Debug for MockBackend<V>
where
    V: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .finish()
    }
}

impl<V> Clone for MockBackend<V> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
        }
    }
}

impl<V> Default for MockBackend<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MockBackend<V> {
    /// Creates a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a mock backend with pre-populated data.
    ///
    /// Seeding does not record any operations.
    #[must_use]
    pub fn with_data<I, K>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
    {
        Self {
            data: Arc::new(Mutex::new(data.into_iter().map(|(k, v)| (k.into(), v)).collect())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
        }
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the backend holds the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Sets a predicate that determines when operations should fail.
    ///
    /// The predicate receives the operation and returns `true` if it should fail.
    /// Failed operations are still recorded but have no effect on the stored data.
    ///
    /// # Examples
    ///
    /// ```
    /// use strata_backend::testing::{BackendOp, MockBackend};
    ///
    /// let backend: MockBackend<i32> = MockBackend::new();
    ///
    /// // Fail all operations
    /// backend.fail_when(|_| true);
    ///
    /// // Fail only writes
    /// backend.fail_when(BackendOp::is_write);
    /// ```
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&BackendOp<V>) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn should_fail(&self, op: &BackendOp<V>) -> bool {
        self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(op))
    }
}

impl<V> MockBackend<V>
where
    V: Clone,
{
    /// Returns the stored value for a key without recording an operation.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<V> {
        self.data.lock().get(key).cloned()
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<BackendOp<V>> {
        self.operations.lock().clone()
    }

    /// Returns the recorded operations that mutated the backend.
    #[must_use]
    pub fn writes(&self) -> Vec<BackendOp<V>> {
        self.operations.lock().iter().filter(|op| op.is_write()).cloned().collect()
    }

    /// Records `op`, then fails if the failure predicate matches it.
    fn check(&self, op: BackendOp<V>, message: &'static str) -> Result<(), Error> {
        let fail = self.should_fail(&op);
        self.operations.lock().push(op);
        if fail { Err(Error::from_message(message)) } else { Ok(()) }
    }
}

impl<V> Backend<V> for MockBackend<V>
where
    V: Clone + Send + Sync,
{
    async fn get_item(&self, key: &str, _opts: &Options) -> Result<Option<V>, Error> {
        self.check(BackendOp::Get(key.to_owned()), "mock: get failed")?;
        Ok(self.data.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: V, _opts: &Options) -> Result<(), Error> {
        self.check(
            BackendOp::Set {
                key: key.to_owned(),
                value: value.clone(),
            },
            "mock: set failed",
        )?;
        self.data.lock().insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str, _opts: &Options) -> Result<(), Error> {
        self.check(BackendOp::Remove(key.to_owned()), "mock: remove failed")?;
        self.data.lock().remove(key);
        Ok(())
    }

    async fn has_item(&self, key: &str, _opts: &Options) -> Result<bool, Error> {
        self.check(BackendOp::Has(key.to_owned()), "mock: has failed")?;
        Ok(self.data.lock().contains_key(key))
    }

    async fn get_keys(&self, prefix: Option<&str>, _opts: &Options) -> Result<Vec<String>, Error> {
        self.check(BackendOp::GetKeys(prefix.map(str::to_owned)), "mock: get_keys failed")?;
        let prefix = prefix.unwrap_or_default();
        let mut keys: Vec<String> = self.data.lock().keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        keys.sort_unstable();
        Ok(keys)
    }

    async fn clear(&self, prefix: Option<&str>, _opts: &Options) -> Result<(), Error> {
        self.check(BackendOp::Clear(prefix.map(str::to_owned)), "mock: clear failed")?;
        let prefix = prefix.unwrap_or_default();
        self.data.lock().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn dispose(&self) -> Result<(), Error> {
        self.check(BackendOp::Dispose, "mock: dispose failed")
    }
}

impl<V> BatchBackend<V> for MockBackend<V>
where
    V: Clone + Send + Sync,
{
    async fn mget(&self, keys: &[String], _opts: &Options) -> Result<Vec<Option<V>>, Error> {
        self.check(BackendOp::MGet(keys.to_vec()), "mock: mget failed")?;
        let data = self.data.lock();
        Ok(keys.iter().map(|k| data.get(k).cloned()).collect())
    }

    async fn mset(&self, pairs: Vec<(String, V)>, _opts: &Options) -> Result<(), Error> {
        self.check(BackendOp::MSet(pairs.clone()), "mock: mset failed")?;
        self.data.lock().extend(pairs);
        Ok(())
    }
}
