// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Field names carried by `cache.event`. They must match the fields in `CacheTelemetry::emit`.

pub(crate) const CACHE_EVENT_NAME: &str = "cache.event";

pub(crate) const CACHE_NAME: &str = "cache.name";

pub(crate) const CACHE_OPERATION_NAME: &str = "cache.operation";

pub(crate) const CACHE_ACTIVITY_NAME: &str = "cache.activity";

pub(crate) const CACHE_LAYER_NAME: &str = "cache.layer";

pub(crate) const CACHE_KEYS_NAME: &str = "cache.keys";
