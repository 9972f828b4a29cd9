// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured log events for cache operations.
//!
//! Every event is named `cache.event` and carries the cache name, the operation, what
//! happened, the layer involved (if any) and how many keys were affected.

use std::sync::Arc;

use tracing::Level;

#[cfg(test)]
pub(crate) mod attributes;
#[cfg(test)]
pub(crate) mod testing;

const DEFAULT_CACHE_NAME: &str = "strata";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Set,
    Sync,
    Remove,
    Clear,
    Dispose,
    Namespace,
    Provider,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Set => "cache.set",
            Self::Sync => "cache.sync",
            Self::Remove => "cache.remove",
            Self::Clear => "cache.clear",
            Self::Dispose => "cache.dispose",
            Self::Namespace => "cache.namespace",
            Self::Provider => "cache.provider",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Ok,
    Registered,
    Promotion,
    Fallback,
    Synced,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Ok => "cache.ok",
            Self::Registered => "cache.registered",
            Self::Promotion => "cache.promotion",
            Self::Fallback => "cache.fallback",
            Self::Synced => "cache.synced",
            Self::Error => "cache.error",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss | Self::Ok | Self::Registered => Level::DEBUG,
            Self::Promotion | Self::Fallback | Self::Synced => Level::INFO,
            Self::Error => Level::ERROR,
        }
    }
}

/// Emits cache events through `tracing`.
///
/// Cheap to clone; the cache hands a copy to its namespace resolver.
#[derive(Debug, Clone)]
pub(crate) struct CacheTelemetry {
    name: Arc<str>,
    logs_enabled: bool,
}

impl Default for CacheTelemetry {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_NAME, true)
    }
}

impl CacheTelemetry {
    pub fn new(name: impl Into<Arc<str>>, logs_enabled: bool) -> Self {
        Self {
            name: name.into(),
            logs_enabled,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn logs_enabled(&self) -> bool {
        self.logs_enabled
    }

    #[inline]
    pub fn record(&self, operation: CacheOperation, activity: CacheActivity, layer: Option<&str>, keys: usize) {
        if self.logs_enabled {
            self.emit(operation, activity, layer, keys);
        }
    }

    fn emit(&self, operation: CacheOperation, activity: CacheActivity, layer: Option<&str>, keys: usize) {
        let name: &str = &self.name;
        let op = operation.as_str();
        let ev = activity.as_str();

        // The tracing level must be a constant, so each level gets its own expansion.
        macro_rules! emit_event {
            ($level:ident) => {
                tracing::$level!(
                    cache.name = name,
                    cache.operation = op,
                    cache.activity = ev,
                    cache.layer = layer,
                    cache.keys = keys,
                    "cache.event"
                )
            };
        }

        match activity.level() {
            Level::ERROR => emit_event!(error),
            Level::INFO => emit_event!(info),
            _ => emit_event!(debug),
        }
    }
}
