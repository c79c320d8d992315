//! Pipeline double that records every bundle it is handed.

use crate::{wait_until, WAIT_TIMEOUT};
use async_trait::async_trait;
use dtn_core::api::pipeline::BundleDispatch;
use dtn_core::Bundle;
use std::sync::Mutex;
use tracing::debug;

/// Pipeline double recording every call it receives.
#[derive(Default)]
pub struct RecordingDispatch {
    dispatched: Mutex<Vec<Bundle>>,
    received: Mutex<Vec<Bundle>>,
    delivered: Mutex<Vec<Bundle>>,
    failed: Mutex<Vec<(String, Bundle)>>,
}

impl RecordingDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatched(&self) -> Vec<Bundle> {
        self.dispatched.lock().expect("dispatch lock").clone()
    }

    pub fn received(&self) -> Vec<Bundle> {
        self.received.lock().expect("dispatch lock").clone()
    }

    pub fn delivered(&self) -> Vec<Bundle> {
        self.delivered.lock().expect("dispatch lock").clone()
    }

    pub fn failed(&self) -> Vec<(String, Bundle)> {
        self.failed.lock().expect("dispatch lock").clone()
    }

    pub async fn wait_for_received(&self, count: usize) -> bool {
        wait_until(WAIT_TIMEOUT, || self.received().len() >= count).await
    }

    pub async fn wait_for_delivered(&self, count: usize) -> bool {
        wait_until(WAIT_TIMEOUT, || self.delivered().len() >= count).await
    }

    pub async fn wait_for_failed(&self, count: usize) -> bool {
        wait_until(WAIT_TIMEOUT, || self.failed().len() >= count).await
    }
}

#[async_trait]
impl BundleDispatch for RecordingDispatch {
    async fn dispatch(&self, bundle: Bundle) {
        debug!(bid = %bundle.bid, "test dispatch: dispatch");
        self.dispatched.lock().expect("dispatch lock").push(bundle);
    }

    async fn bundle_reception(&self, bundle: Bundle) {
        debug!(bid = %bundle.bid, "test dispatch: bundle_reception");
        self.received.lock().expect("dispatch lock").push(bundle);
    }

    async fn local_delivery_successful(&self, bundle: &Bundle) {
        self.delivered
            .lock()
            .expect("dispatch lock")
            .push(bundle.clone());
    }

    async fn local_delivery_failure(&self, sink: &str, bundle: &Bundle) {
        self.failed
            .lock()
            .expect("dispatch lock")
            .push((sink.to_string(), bundle.clone()));
    }
}
