//! Link-local table: the set of open channels and the queries routed through it.

use crate::api::channel::ClaChannel;
use crate::api::pipeline::BundleDispatch;
use crate::component::CoreComponent;
use crate::data_plane::ingestion::ChannelIngestion;
use crate::eid::Eid;
use crate::events::{ChannelEvent, EventBus, LinkLocalEntryDown, LinkLocalEntryUp};
use crate::observability::{events, fields};
use crate::routing::channel_identity::ChannelIdentityKey;
use crate::routing::error::LinkLocalError;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::AbortHandle;
use tracing::{debug, info};

const COMPONENT: &str = "link_local_table";

struct ChannelEntry {
    key: ChannelIdentityKey,
    lifecycle: u64,
    ingestion: AbortHandle,
}

/// One open channel in [`LinkLocalTable::dump_table`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLocalRow {
    pub channel_eid: Eid,
    pub local_eid: Eid,
}

/// Diagnostic view of the open channels in open order; `None` rows when disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkLocalDump {
    pub rows: Option<Vec<LinkLocalRow>>,
}

impl Display for LinkLocalDump {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "current link-local table:")?;
        writeln!(f, "-------------------------")?;
        match &self.rows {
            None => writeln!(f, "disabled"),
            Some(rows) => {
                for row in rows {
                    writeln!(f, "{} -> {}", row.local_eid, row.channel_eid)?;
                }
                Ok(())
            }
        }
    }
}

pub struct LinkLocalTable {
    component: CoreComponent,
    // Kept in open order; lookups rely on it for their tie-break.
    channels: Mutex<Vec<ChannelEntry>>,
    next_lifecycle: AtomicU64,
    dispatch: Arc<dyn BundleDispatch>,
    events: EventBus,
}

impl LinkLocalTable {
    pub fn new(dispatch: Arc<dyn BundleDispatch>, events: EventBus) -> Arc<Self> {
        Arc::new(Self {
            component: CoreComponent::new(COMPONENT),
            channels: Mutex::new(Vec::new()),
            next_lifecycle: AtomicU64::new(0),
            dispatch,
            events,
        })
    }

    pub fn component(&self) -> &CoreComponent {
        &self.component
    }

    pub fn enable(&self) -> bool {
        self.component.enable()
    }

    pub fn disable(&self) -> bool {
        self.component.disable()
    }

    pub fn is_enabled(&self) -> bool {
        self.component.is_enabled()
    }

    /// Adds a channel and starts ingesting its inbound bundles.
    ///
    /// Returns `false`, without publishing, if the same channel object is already open.
    pub async fn channel_opened(self: &Arc<Self>, channel: Arc<dyn ClaChannel>) -> bool {
        let key = ChannelIdentityKey::new(channel.clone());
        let mut channels = self.channels.lock().await;

        if channels.iter().any(|entry| entry.key == key) {
            debug!(
                event = events::CHANNEL_ALREADY_OPEN,
                component = COMPONENT,
                channel_eid = %fields::format_eid(channel.channel_eid()),
                "channel already open"
            );
            return false;
        }

        let lifecycle = self.next_lifecycle.fetch_add(1, Ordering::Relaxed);
        let ingestion = ChannelIngestion::new(
            key.clone(),
            channel.recv_bundles(),
            lifecycle,
            self.dispatch.clone(),
            Arc::downgrade(self),
        );
        let ingestion = tokio::spawn(ingestion.run()).abort_handle();
        channels.push(ChannelEntry {
            key,
            lifecycle,
            ingestion,
        });

        info!(
            event = events::LINK_LOCAL_ENTRY_UP,
            component = COMPONENT,
            channel_eid = %fields::format_eid(channel.channel_eid()),
            local_eid = %fields::format_eid(channel.local_eid()),
            lifecycle,
            "channel open"
        );
        // Published under the lock so a concurrent close cannot announce Down first.
        self.events.publish(LinkLocalEntryUp { channel });
        true
    }

    /// Removes a channel and stops its ingestion. Returns `false` if it was not open.
    pub async fn channel_closed(&self, channel: &Arc<dyn ClaChannel>) -> bool {
        let key = ChannelIdentityKey::new(channel.clone());
        let mut channels = self.channels.lock().await;
        let Some(position) = channels.iter().position(|entry| entry.key == key) else {
            return false;
        };
        let entry = channels.remove(position);
        entry.ingestion.abort();
        self.announce_down(&entry);
        true
    }

    /// Closes the channel only if it is still in the given lifecycle.
    pub(crate) async fn close_lifecycle(&self, key: &ChannelIdentityKey, lifecycle: u64) -> bool {
        let mut channels = self.channels.lock().await;
        let Some(position) = channels
            .iter()
            .position(|entry| entry.key == *key && entry.lifecycle == lifecycle)
        else {
            return false;
        };
        let entry = channels.remove(position);
        self.announce_down(&entry);
        true
    }

    fn announce_down(&self, entry: &ChannelEntry) {
        let channel = entry.key.channel().clone();
        info!(
            event = events::LINK_LOCAL_ENTRY_DOWN,
            component = COMPONENT,
            channel_eid = %fields::format_eid(channel.channel_eid()),
            lifecycle = entry.lifecycle,
            "channel closed"
        );
        self.events.publish(LinkLocalEntryDown { channel });
    }

    /// Closes every open channel, in open order.
    pub async fn close_all(&self) -> usize {
        let mut channels = self.channels.lock().await;
        let closed: Vec<ChannelEntry> = channels.drain(..).collect();
        for entry in &closed {
            entry.ingestion.abort();
            self.announce_down(entry);
        }
        closed.len()
    }

    pub async fn contains(&self, channel: &Arc<dyn ClaChannel>) -> bool {
        let key = ChannelIdentityKey::new(channel.clone());
        self.channels
            .lock()
            .await
            .iter()
            .any(|entry| entry.key == key)
    }

    pub async fn len(&self) -> usize {
        self.channels.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Local identifier of the earliest opened channel whose local identifier `eid`
    /// matches. A disabled table knows no link-local identifiers.
    pub async fn is_eid_link_local(&self, eid: &Eid) -> Option<Eid> {
        if !self.component.is_enabled() {
            return None;
        }
        self.channels
            .lock()
            .await
            .iter()
            .map(|entry| entry.key.channel().local_eid())
            .find(|local| eid.matches(local))
            .cloned()
    }

    /// Most recently opened channel whose neighbour identifier `destination` matches.
    pub async fn find_cla(
        &self,
        destination: &Eid,
    ) -> Result<Option<Arc<dyn ClaChannel>>, LinkLocalError> {
        if !self.component.is_enabled() {
            return Err(LinkLocalError::ComponentDisabled);
        }
        Ok(self
            .channels
            .lock()
            .await
            .iter()
            .rev()
            .map(|entry| entry.key.channel())
            .find(|channel| destination.matches(channel.channel_eid()))
            .cloned())
    }

    pub async fn dump_table(&self) -> LinkLocalDump {
        if !self.component.is_enabled() {
            return LinkLocalDump { rows: None };
        }
        let rows = self
            .channels
            .lock()
            .await
            .iter()
            .map(|entry| LinkLocalRow {
                channel_eid: entry.key.channel().channel_eid().clone(),
                local_eid: entry.key.channel().local_eid().clone(),
            })
            .collect();
        LinkLocalDump { rows: Some(rows) }
    }

    /// Applies a transport notification. Ignored while the table is disabled.
    pub async fn handle_channel_event(self: &Arc<Self>, event: ChannelEvent) {
        if !self.component.is_enabled() {
            debug!(
                event = events::CHANNEL_EVENT_IGNORED,
                component = COMPONENT,
                channel_event = ?event,
                "table disabled, ignoring channel event"
            );
            return;
        }
        self.events.publish(event.clone());
        match event {
            ChannelEvent::Opened(opened) => {
                self.channel_opened(opened.channel).await;
            }
            ChannelEvent::Closed(closed) => {
                self.channel_closed(&closed.channel).await;
            }
        }
    }

    /// Consumes transport notifications until every sender is dropped.
    pub async fn run_channel_events(
        self: Arc<Self>,
        mut channel_events: mpsc::Receiver<ChannelEvent>,
    ) {
        while let Some(event) = channel_events.recv().await {
            self.handle_channel_event(event).await;
        }
        info!(
            event = events::CHANNEL_EVENT_LOOP_STOPPED,
            component = COMPONENT,
            "channel event queue closed"
        );
    }
}
