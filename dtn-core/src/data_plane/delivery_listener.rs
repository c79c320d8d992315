//! Retry of bundles that reached the node before their sink could take them.
//!
//! The listener owns the watch-list of `(sink, bundle id)` pairs. When a registration
//! for a sink becomes active it claims every waiting entry of that sink, fetches the
//! bundles from storage and pushes them through the new callback. A claimed entry is
//! in flight: other activations skip it, so a bundle is never pushed twice by
//! overlapping retries.

use crate::api::pipeline::BundleDispatch;
use crate::api::storage::BundleStorage;
use crate::bundle::BundleId;
use crate::events::RegistrationActive;
use crate::observability::{events, fields};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const COMPONENT: &str = "delivery_listener";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchState {
    Waiting,
    InFlight,
}

type WatchList = HashMap<String, HashMap<BundleId, WatchState>>;

/// What one activation did with the sink's watched bundles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryOutcome {
    pub delivered: usize,
    pub refused: usize,
    pub fetch_failed: usize,
}

pub struct DeliveryListener {
    watch_list: Mutex<WatchList>,
    storage: Arc<dyn BundleStorage>,
    dispatch: Arc<dyn BundleDispatch>,
}

impl DeliveryListener {
    pub fn new(storage: Arc<dyn BundleStorage>, dispatch: Arc<dyn BundleDispatch>) -> Self {
        Self {
            watch_list: Mutex::new(HashMap::new()),
            storage,
            dispatch,
        }
    }

    /// Returns `false` if the pair was already watched.
    pub async fn watch(&self, sink: &str, bid: BundleId) -> bool {
        let mut watch_list = self.watch_list.lock().await;
        let entries = watch_list.entry(sink.to_string()).or_default();
        if entries.contains_key(&bid) {
            return false;
        }
        entries.insert(bid, WatchState::Waiting);
        true
    }

    /// Returns `false` if the pair was not watched.
    pub async fn unwatch(&self, sink: &str, bid: &BundleId) -> bool {
        let mut watch_list = self.watch_list.lock().await;
        let Some(entries) = watch_list.get_mut(sink) else {
            return false;
        };
        let removed = entries.remove(bid).is_some();
        if entries.is_empty() {
            watch_list.remove(sink);
        }
        removed
    }

    pub async fn is_watched(&self, sink: &str, bid: &BundleId) -> bool {
        self.watch_list
            .lock()
            .await
            .get(sink)
            .is_some_and(|entries| entries.contains_key(bid))
    }

    /// Watched bundle ids of `sink`, sorted.
    pub async fn watched(&self, sink: &str) -> Vec<BundleId> {
        let mut bids: Vec<BundleId> = self
            .watch_list
            .lock()
            .await
            .get(sink)
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        bids.sort();
        bids
    }

    pub async fn len(&self) -> usize {
        self.watch_list.lock().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Marks one waiting entry as in flight.
    pub(crate) async fn claim(&self, sink: &str, bid: &BundleId) -> bool {
        let mut watch_list = self.watch_list.lock().await;
        match watch_list.get_mut(sink).and_then(|entries| entries.get_mut(bid)) {
            Some(state) if *state == WatchState::Waiting => {
                *state = WatchState::InFlight;
                true
            }
            _ => false,
        }
    }

    /// Puts an in-flight entry back to waiting, unless it was unwatched meanwhile.
    pub(crate) async fn release(&self, sink: &str, bid: &BundleId) {
        let mut watch_list = self.watch_list.lock().await;
        if let Some(state) = watch_list.get_mut(sink).and_then(|entries| entries.get_mut(bid)) {
            *state = WatchState::Waiting;
        }
    }

    async fn claim_all(&self, sink: &str) -> Vec<BundleId> {
        let mut watch_list = self.watch_list.lock().await;
        let Some(entries) = watch_list.get_mut(sink) else {
            return Vec::new();
        };
        let mut claimed: Vec<BundleId> = entries
            .iter_mut()
            .filter(|(_, state)| **state == WatchState::Waiting)
            .map(|(bid, state)| {
                *state = WatchState::InFlight;
                bid.clone()
            })
            .collect();
        claimed.sort();
        claimed
    }

    pub(crate) fn storage(&self) -> &Arc<dyn BundleStorage> {
        &self.storage
    }

    /// Retries every bundle watched under `event.sink` at the time of the call.
    ///
    /// A bundle whose fetch fails stays watched and nothing is signalled. A bundle the
    /// callback refuses also stays watched, and the pipeline is told about the failure.
    pub async fn on_registration_active(&self, event: &RegistrationActive) -> RetryOutcome {
        let mut outcome = RetryOutcome::default();
        let claimed = self.claim_all(&event.sink).await;
        if claimed.is_empty() {
            return outcome;
        }

        debug!(
            event = events::DELIVERY_RETRY_START,
            component = COMPONENT,
            sink = %event.sink,
            watched = claimed.len(),
            "retrying watched bundles"
        );

        for bid in claimed {
            let bundle = match self.storage.get(&bid).await {
                Ok(bundle) => bundle,
                Err(err) => {
                    debug!(
                        event = events::DELIVERY_RETRY_FETCH_FAILED,
                        component = COMPONENT,
                        sink = %event.sink,
                        bid = %fields::format_bundle_id(&bid),
                        err = %err,
                        "unable to fetch watched bundle, keeping it watched"
                    );
                    self.release(&event.sink, &bid).await;
                    outcome.fetch_failed += 1;
                    continue;
                }
            };

            match event.callback.recv(&bundle).await {
                Ok(()) => {
                    self.unwatch(&event.sink, &bid).await;
                    self.dispatch.local_delivery_successful(&bundle).await;
                    info!(
                        event = events::DELIVERY_RETRY_OK,
                        component = COMPONENT,
                        sink = %event.sink,
                        bid = %fields::format_bundle_id(&bid),
                        "delivered watched bundle"
                    );
                    outcome.delivered += 1;
                }
                Err(err) => {
                    self.release(&event.sink, &bid).await;
                    self.dispatch
                        .local_delivery_failure(&event.sink, &bundle)
                        .await;
                    warn!(
                        event = events::DELIVERY_RETRY_FAILED,
                        component = COMPONENT,
                        sink = %event.sink,
                        bid = %fields::format_bundle_id(&bid),
                        err = %err,
                        "watched bundle delivery failed"
                    );
                    outcome.refused += 1;
                }
            }
        }

        outcome
    }

    /// Consumes activations until every sender is dropped. Each activation is handled
    /// on its own task so a slow agent does not hold back other sinks.
    pub async fn run(self: Arc<Self>, mut activations: UnboundedReceiver<RegistrationActive>) {
        while let Some(event) = activations.recv().await {
            let listener = self.clone();
            tokio::spawn(async move {
                listener.on_registration_active(&event).await;
            });
        }
        info!(
            event = events::DELIVERY_LISTENER_STOPPED,
            component = COMPONENT,
            "activation queue closed"
        );
    }
}
