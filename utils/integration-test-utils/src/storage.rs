//! In-memory bundle storage with an on/off failure switch.

use async_trait::async_trait;
use dtn_core::api::storage::{BundleStorage, StorageError};
use dtn_core::{Bundle, BundleId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Storage backed by a map, with a switch that makes every read fail.
#[derive(Default)]
pub struct MemoryStorage {
    bundles: Mutex<HashMap<BundleId, Bundle>>,
    unavailable: AtomicBool,
    gets: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bundle: Bundle) {
        self.bundles
            .lock()
            .expect("storage lock")
            .insert(bundle.bid.clone(), bundle);
    }

    pub fn remove(&self, bid: &BundleId) -> Option<Bundle> {
        self.bundles.lock().expect("storage lock").remove(bid)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `get` calls served so far, failed ones included.
    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BundleStorage for MemoryStorage {
    async fn get(&self, bid: &BundleId) -> Result<Bundle, StorageError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("storage switched off".to_string()));
        }
        self.bundles
            .lock()
            .expect("storage lock")
            .get(bid)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(bid.clone()))
    }
}
