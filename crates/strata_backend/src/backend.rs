// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The capability traits every storage backend implements.
//!
//! [`Backend`] is the single-key contract. Backends that can read or write many keys
//! in one round trip additionally implement [`BatchBackend`]; the layer adapter uses
//! the native batch calls for those and fans out single-key calls for everything else.

use crate::{Error, Options, Unwatch, WatchCallback};

/// Trait for key-value storage backends.
///
/// Implement this trait to plug a store into a layered cache. Every operation is
/// asynchronous and may fail; a missing key is reported as `Ok(None)`, never as an error.
///
/// `get_item`, `set_item`, `remove_item`, `get_keys`, and `clear` are required. The rest
/// have default implementations:
/// - `has_item`: `get_item` returned a value
/// - `dispose`, `unwatch`: do nothing
/// - `watch`: returns a no-op [`Unwatch`] handle and never calls the callback
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use std::sync::RwLock;
///
/// use strata_backend::{Backend, Error, Options};
///
/// struct MapBackend(RwLock<HashMap<String, String>>);
///
/// impl Backend<String> for MapBackend {
///     async fn get_item(&self, key: &str, _opts: &Options) -> Result<Option<String>, Error> {
///         Ok(self.0.read().unwrap().get(key).cloned())
///     }
///
///     async fn set_item(&self, key: &str, value: String, _opts: &Options) -> Result<(), Error> {
///         self.0.write().unwrap().insert(key.to_owned(), value);
///         Ok(())
///     }
///
///     async fn remove_item(&self, key: &str, _opts: &Options) -> Result<(), Error> {
///         self.0.write().unwrap().remove(key);
///         Ok(())
///     }
///
///     async fn get_keys(&self, prefix: Option<&str>, _opts: &Options) -> Result<Vec<String>, Error> {
///         let prefix = prefix.unwrap_or_default();
///         Ok(self.0.read().unwrap().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
///     }
///
///     async fn clear(&self, prefix: Option<&str>, _opts: &Options) -> Result<(), Error> {
///         let prefix = prefix.unwrap_or_default();
///         self.0.write().unwrap().retain(|k, _| !k.starts_with(prefix));
///         Ok(())
///     }
/// }
/// ```
pub trait Backend<V>: Send + Sync {
    /// Reads one key.
    fn get_item(&self, key: &str, opts: &Options) -> impl Future<Output = Result<Option<V>, Error>> + Send;

    /// Writes one key.
    fn set_item(&self, key: &str, value: V, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes one key. Removing a missing key is not an error.
    fn remove_item(&self, key: &str, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    /// Lists the keys starting with `prefix`, or every key when `prefix` is `None`.
    fn get_keys(&self, prefix: Option<&str>, opts: &Options) -> impl Future<Output = Result<Vec<String>, Error>> + Send;

    /// Removes every key starting with `prefix`, or every key when `prefix` is `None`.
    fn clear(&self, prefix: Option<&str>, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns `true` if the key holds a value.
    fn has_item(&self, key: &str, opts: &Options) -> impl Future<Output = Result<bool, Error>> + Send {
        async move { Ok(self.get_item(key, opts).await?.is_some()) }
    }

    /// Releases any resources held by the backend.
    fn dispose(&self) -> impl Future<Output = Result<(), Error>> + Send {
        async { Ok(()) }
    }

    /// Subscribes to change events.
    fn watch(&self, callback: WatchCallback) -> impl Future<Output = Result<Unwatch, Error>> + Send {
        drop(callback);
        async { Ok(Unwatch::noop()) }
    }

    /// Drops every subscription registered through [`watch`](Self::watch).
    fn unwatch(&self) -> impl Future<Output = Result<(), Error>> + Send {
        async { Ok(()) }
    }
}

/// A backend with native multi-key operations.
///
/// Layers built from a `BatchBackend` forward batches as-is instead of issuing one
/// call per key.
pub trait BatchBackend<V>: Backend<V> {
    /// Reads many keys. The result has the same length and order as `keys`.
    fn mget(&self, keys: &[String], opts: &Options) -> impl Future<Output = Result<Vec<Option<V>>, Error>> + Send;

    /// Writes many key-value pairs.
    fn mset(&self, pairs: Vec<(String, V)>, opts: &Options) -> impl Future<Output = Result<(), Error>> + Send;
}
