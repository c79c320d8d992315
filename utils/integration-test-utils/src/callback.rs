//! Active-registration callback that records what it is given.

use crate::{wait_until, WAIT_TIMEOUT};
use async_trait::async_trait;
use dtn_core::api::delivery::{ActiveRegistrationCallback, DeliveryError};
use dtn_core::Bundle;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Application-agent double. Accepts bundles unless told to refuse them.
#[derive(Default)]
pub struct RecordingCallback {
    accepted: Mutex<Vec<Bundle>>,
    calls: AtomicUsize,
    refuse: AtomicBool,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        let callback = Self::default();
        callback.set_refuse(true);
        callback
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Every `recv` call, refused ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> Vec<Bundle> {
        self.accepted.lock().expect("callback lock").clone()
    }

    pub async fn wait_for_calls(&self, count: usize) -> bool {
        wait_until(WAIT_TIMEOUT, || self.calls() >= count).await
    }
}

#[async_trait]
impl ActiveRegistrationCallback for RecordingCallback {
    async fn recv(&self, bundle: &Bundle) -> Result<(), DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(DeliveryError::DeliveryRefused(
                "test agent refuses bundles".to_string(),
            ));
        }
        self.accepted
            .lock()
            .expect("callback lock")
            .push(bundle.clone());
        Ok(())
    }
}
