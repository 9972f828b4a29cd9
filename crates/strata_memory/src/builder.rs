// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Construction options for [`MemoryBackend`].
//!
//! These are the "backend construction options" a layered cache accepts in place of a
//! ready-made backend: the cache builds the backend and appends it as a layer.

use std::marker::PhantomData;
use std::time::Duration;

use crate::backend::MemoryBackend;

/// Options for building a [`MemoryBackend`].
///
/// Every setting is optional. Without any, the backend is unbounded and entries never
/// expire on their own.
///
/// # Examples
///
/// ```
/// use strata_memory::MemoryBackend;
/// use std::time::Duration;
///
/// let backend = MemoryBackend::<String>::builder()
///     .max_capacity(10_000)
///     .time_to_live(Duration::from_secs(300))
///     .name("sessions")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct MemoryBackendBuilder<V> {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) time_to_live: Option<Duration>,
    pub(crate) time_to_idle: Option<Duration>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<fn() -> V>,
}

impl<V> Default for MemoryBackendBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryBackendBuilder<V> {
    /// Creates a builder with no limits and no expiration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: None,
            initial_capacity: None,
            time_to_live: None,
            time_to_idle: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Caps the number of stored keys.
    ///
    /// Past the cap, moka's `TinyLFU` policy decides which keys to evict. Eviction is a
    /// backend concern: the layered cache simply sees the key as absent and reads deeper.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Pre-allocates room for `capacity` keys.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Expires every key `duration` after it was written.
    #[must_use]
    pub fn time_to_live(mut self, duration: Duration) -> Self {
        self.time_to_live = Some(duration);
        self
    }

    /// Expires every key after `duration` without reads or writes.
    #[must_use]
    pub fn time_to_idle(mut self, duration: Duration) -> Self {
        self.time_to_idle = Some(duration);
        self
    }

    /// Names the backend. The name is also used for the layer in log events.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the backend.
    #[must_use]
    pub fn build(self) -> MemoryBackend<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        MemoryBackend::from_builder(&self)
    }
}
