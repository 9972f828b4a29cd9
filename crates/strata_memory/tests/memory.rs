// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `MemoryBackend`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use strata_backend::{Backend, Options, StorageValue, WatchEvent};
use strata_memory::{MemoryBackend, MemoryBackendBuilder};

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn opts() -> &'static Options {
    Options::empty()
}

#[test]
fn get_returns_none_for_missing_key() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        let result = backend.get_item("missing", opts()).await.expect("get failed");
        assert!(result.is_none());
    });
}

#[test]
fn set_overwrites_existing_value() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        backend.set_item("key", 42, opts()).await.expect("set failed");
        backend.set_item("key", 100, opts()).await.expect("set failed");

        assert_eq!(backend.get_item("key", opts()).await.expect("get failed"), Some(100));
    });
}

#[test]
fn falsy_values_are_stored() {
    block_on(async {
        let backend = MemoryBackend::<StorageValue>::new();
        backend.set_item("off", StorageValue::from(false), opts()).await.expect("set failed");
        backend.set_item("empty", StorageValue::from(""), opts()).await.expect("set failed");

        assert!(backend.has_item("off", opts()).await.expect("has failed"));
        assert_eq!(
            backend.get_item("empty", opts()).await.expect("get failed"),
            Some(StorageValue::from(""))
        );
    });
}

#[test]
fn remove_then_has_is_false() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        backend.set_item("key", 1, opts()).await.expect("set failed");
        backend.remove_item("key", opts()).await.expect("remove failed");

        assert!(!backend.has_item("key", opts()).await.expect("has failed"));
        // removing again is not an error
        backend.remove_item("key", opts()).await.expect("remove failed");
    });
}

#[test]
fn get_keys_filters_and_sorts_by_prefix() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        for (key, value) in [("user:2", 2), ("user:1", 1), ("token:1", 3)] {
            backend.set_item(key, value, opts()).await.expect("set failed");
        }

        let keys = backend.get_keys(Some("user:"), opts()).await.expect("get_keys failed");
        assert_eq!(keys, vec!["user:1".to_string(), "user:2".to_string()]);

        let all = backend.get_keys(None, opts()).await.expect("get_keys failed");
        assert_eq!(all.len(), 3);
    });
}

#[test]
fn clear_with_prefix_keeps_other_keys() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        backend.set_item("user:1", 1, opts()).await.expect("set failed");
        backend.set_item("token:1", 2, opts()).await.expect("set failed");

        backend.clear(Some("user:"), opts()).await.expect("clear failed");

        assert!(backend.get_item("user:1", opts()).await.expect("get failed").is_none());
        assert_eq!(backend.get_item("token:1", opts()).await.expect("get failed"), Some(2));

        backend.clear(None, opts()).await.expect("clear failed");
        assert!(backend.get_item("token:1", opts()).await.expect("get failed").is_none());
    });
}

#[test]
fn watch_reports_updates_and_removals_until_unwatched() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let handle = backend
            .watch(Arc::new(move |event: WatchEvent, key: &str| {
                sink.lock().expect("lock poisoned").push((event, key.to_string()));
            }))
            .await
            .expect("watch failed");

        backend.set_item("a", 1, opts()).await.expect("set failed");
        backend.remove_item("a", opts()).await.expect("remove failed");
        handle.unwatch();
        backend.set_item("b", 2, opts()).await.expect("set failed");

        assert_eq!(
            *events.lock().expect("lock poisoned"),
            vec![(WatchEvent::Update, "a".to_string()), (WatchEvent::Remove, "a".to_string())]
        );
    });
}

#[test]
fn unwatch_drops_every_subscription() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        let count = Arc::new(Mutex::new(0_u32));
        for _ in 0..2 {
            let counter = Arc::clone(&count);
            let _handle = backend
                .watch(Arc::new(move |_event: WatchEvent, _key: &str| {
                    *counter.lock().expect("lock poisoned") += 1;
                }))
                .await
                .expect("watch failed");
        }

        backend.set_item("a", 1, opts()).await.expect("set failed");
        backend.unwatch().await.expect("unwatch failed");
        backend.set_item("b", 1, opts()).await.expect("set failed");

        assert_eq!(*count.lock().expect("lock poisoned"), 2);
    });
}

#[test]
fn clones_share_storage() {
    block_on(async {
        let backend = MemoryBackend::<i32>::new();
        let clone = backend.clone();
        backend.set_item("key", 7, opts()).await.expect("set failed");
        assert_eq!(clone.get_item("key", opts()).await.expect("get failed"), Some(7));
    });
}

#[test]
fn builder_applies_name() {
    let backend = MemoryBackendBuilder::<i32>::new()
        .max_capacity(100)
        .initial_capacity(10)
        .time_to_live(Duration::from_secs(60))
        .time_to_idle(Duration::from_secs(30))
        .name("l1")
        .build();
    assert_eq!(backend.name(), Some("l1"));

    let unnamed = MemoryBackend::<i32>::with_capacity(10);
    assert_eq!(unnamed.name(), None);
}
