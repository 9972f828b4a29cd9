// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory backend for the strata layered cache, backed by moka.
//!
//! [`MemoryBackend`] implements the [`strata_backend::Backend`] contract on top of moka's
//! concurrent async cache. It is the usual shallowest layer of a layered cache and the
//! default backend built from construction options. Use [`MemoryBackendBuilder`] to set
//! capacity, TTL, and TTI without exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use strata_backend::{Backend, Options};
//! use strata_memory::MemoryBackendBuilder;
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let backend = MemoryBackendBuilder::<i32>::new()
//!     .max_capacity(1000)
//!     .time_to_live(Duration::from_secs(300))
//!     .build();
//!
//! backend.set_item("key", 42, Options::empty()).await?;
//! assert_eq!(backend.get_item("key", Options::empty()).await?, Some(42));
//! # Ok::<(), strata_backend::Error>(())
//! # });
//! ```

mod backend;
pub mod builder;

#[doc(inline)]
pub use backend::MemoryBackend;
#[doc(inline)]
pub use builder::MemoryBackendBuilder;
