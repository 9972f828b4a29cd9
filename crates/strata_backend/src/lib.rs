// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Backend capability contract for the strata layered cache.
//!
//! This crate defines the [`Backend`] trait that every storage backend must satisfy,
//! the optional [`BatchBackend`] extension for stores with native multi-key calls,
//! [`StorageValue`] as the default stored value, and the [`Error`] type shared by
//! every fallible operation.
//!
//! # Overview
//!
//! The backend abstraction separates storage concerns from caching behavior. Implement
//! [`Backend`] for your store, then hand it to `strata` as a layer: the cache adds
//! read fill-through, write-through, key namespacing, and computed fallback values
//! on top.
//!
//! # Testing
//!
//! Enable the `test-util` feature for [`testing::MockBackend`], which records every
//! call and can be told to fail selected operations.

mod backend;
pub mod error;
mod options;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod value;
mod watch;

#[doc(inline)]
pub use backend::{Backend, BatchBackend};
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use options::Options;
#[doc(inline)]
pub use value::StorageValue;
#[doc(inline)]
pub use watch::{Unwatch, WatchCallback, WatchEvent};
