// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for `Backend` trait default implementations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strata_backend::{Backend, Error, Options, StorageValue, WatchEvent};

/// Minimal implementation that only provides required methods
struct MinimalBackend {
    data: Mutex<HashMap<String, StorageValue>>,
}

impl MinimalBackend {
    fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Backend<StorageValue> for MinimalBackend {
    async fn get_item(&self, key: &str, _opts: &Options) -> Result<Option<StorageValue>, Error> {
        Ok(self.data.lock().expect("lock poisoned").get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: StorageValue, _opts: &Options) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str, _opts: &Options) -> Result<(), Error> {
        self.data.lock().expect("lock poisoned").remove(key);
        Ok(())
    }

    async fn get_keys(&self, prefix: Option<&str>, _opts: &Options) -> Result<Vec<String>, Error> {
        let prefix = prefix.unwrap_or_default();
        Ok(self
            .data
            .lock()
            .expect("lock poisoned")
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn clear(&self, prefix: Option<&str>, _opts: &Options) -> Result<(), Error> {
        let prefix = prefix.unwrap_or_default();
        self.data.lock().expect("lock poisoned").retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

#[test]
fn has_item_default_reports_presence() {
    block_on(async {
        let backend = MinimalBackend::new();
        let opts = Options::new();

        assert!(!backend.has_item("flag", &opts).await.expect("has failed"));

        backend.set_item("flag", StorageValue::from(false), &opts).await.expect("set failed");
        assert!(backend.has_item("flag", &opts).await.expect("has failed"));
    });
}

#[test]
fn dispose_default_succeeds() {
    block_on(async {
        let backend = MinimalBackend::new();
        backend.dispose().await.expect("dispose failed");
    });
}

#[test]
fn watch_default_never_fires() {
    block_on(async {
        let backend = MinimalBackend::new();
        let fired = Arc::new(Mutex::new(0_u32));
        let counter = Arc::clone(&fired);

        let handle = backend
            .watch(Arc::new(move |_event: WatchEvent, _key: &str| {
                *counter.lock().expect("lock poisoned") += 1;
            }))
            .await
            .expect("watch failed");

        backend
            .set_item("k", StorageValue::from(1), Options::empty())
            .await
            .expect("set failed");
        handle.unwatch();

        assert_eq!(*fired.lock().expect("lock poisoned"), 0);
    });
}

#[test]
fn options_pass_presence_through() {
    let opts = Options::new().with("nx", true);
    assert!(opts.contains("nx"));
    assert_eq!(opts.get("nx"), Some(&serde_json::Value::Bool(true)));
    assert!(Options::empty().is_empty());
}
