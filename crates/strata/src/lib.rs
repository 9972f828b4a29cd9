// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A layered read-through/write-through key-value cache.
//!
//! This crate stacks independent, possibly slow backends into one key-value interface:
//! - Reads try each layer in order and write values found deeper back into the
//!   shallower layers that missed them
//! - Writes go to every layer concurrently
//! - Keys can be namespaced by a prefix computed from caller-owned context
//! - Keys no layer holds can be computed by prefix-routed value providers
//!
//! Backends implement [`Backend`] (or [`BatchBackend`] for native multi-key calls) from
//! `strata_backend`; `strata_memory` provides an in-memory one.
//!
//! # Examples
//!
//! ## Promotion From a Deep Layer
//!
//! ```
//! use strata::{Backend, LayeredCache, Options, StorageValue};
//! use strata_memory::MemoryBackend;
//! # futures::executor::block_on(async {
//!
//! let local = MemoryBackend::<StorageValue>::new();
//! let remote = MemoryBackend::<StorageValue>::new();
//! remote.set_item("user:1", StorageValue::from("ada"), Options::empty()).await?;
//!
//! let cache = LayeredCache::new().with_layer(local.clone()).with_layer(remote);
//!
//! assert_eq!(cache.get("user:1").await?, Some(StorageValue::from("ada")));
//! assert_eq!(local.get_item("user:1", Options::empty()).await?, Some(StorageValue::from("ada")));
//! # Ok::<(), strata::Error>(())
//! # });
//! ```
//!
//! ## Namespaces and Computed Values
//!
//! ```
//! use strata::{LayeredCache, NamespaceContext, StorageValue, provider_fn};
//! # futures::executor::block_on(async {
//!
//! let tenant = NamespaceContext::new("acme".to_string());
//!
//! let cache = LayeredCache::<StorageValue>::builder()
//!     .memory_layer()
//!     .namespace(tenant.clone(), |tenant: String| async move { tenant }, ":")
//!     .value_provider("acme:motd", provider_fn(|_key: String| async { Some(StorageValue::from("hi")) }))
//!     .build()?;
//!
//! assert_eq!(cache.get("motd").await?, Some(StorageValue::from("hi")));
//!
//! tenant.replace("globex".to_string());
//! assert_eq!(cache.get("motd").await?, None);
//! # Ok::<(), strata::Error>(())
//! # });
//! ```

pub mod builder;
pub mod cache;
pub mod layer;
pub mod namespace;
pub mod provider;
mod telemetry;

#[doc(inline)]
pub use builder::LayeredCacheBuilder;
#[doc(inline)]
pub use cache::LayeredCache;
#[doc(inline)]
pub use layer::Layer;
#[doc(inline)]
pub use namespace::{DEFAULT_SEPARATOR, NamespaceContext, NamespaceResolver};
#[doc(inline)]
pub use provider::{FnValueProvider, ValueProvider, ValueProviderRegistry, provider_fn};
#[doc(inline)]
pub use strata_backend::{Backend, BatchBackend, Error, ErrorKind, Options, Result, StorageValue, Unwatch, WatchCallback, WatchEvent};
#[cfg(feature = "memory")]
#[doc(inline)]
pub use strata_memory::{MemoryBackend, MemoryBackendBuilder};
