// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Change notifications emitted by backends.

use std::{fmt, sync::Arc};

/// The kind of change a backend observed for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    /// The key was written.
    Update,
    /// The key was removed.
    Remove,
}

/// Callback invoked by a backend for every observed change.
pub type WatchCallback = Arc<dyn Fn(WatchEvent, &str) + Send + Sync>;

/// Handle returned by `watch` that stops the subscription when consumed.
///
/// Dropping the handle without calling [`Unwatch::unwatch`] leaves the
/// subscription active until the backend's own `unwatch` is called.
pub struct Unwatch(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Unwatch {
    /// Creates a handle that runs `f` when unwatched.
    pub fn new(f: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Creates a handle for backends that do not support watching.
    #[must_use]
    pub fn noop() -> Self {
        Self(None)
    }

    /// Stops the subscription this handle was created for.
    pub fn unwatch(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl fmt::Debug for Unwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unwatch").field("active", &self.0.is_some()).finish()
    }
}
