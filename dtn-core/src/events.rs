//! Event values and the instance-scoped event bus.
//!
//! Events are immutable values carrying only their fields. The [`EventBus`] fans each
//! published event out to every receiver subscribed at publication time; nothing is
//! persisted or replayed. There is no process-wide bus: the core owns one instance and
//! hands clones of it to the components that publish.

use crate::api::channel::ClaChannel;
use crate::api::delivery::ActiveRegistrationCallback;
use crate::observability::events;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

const COMPONENT: &str = "event_bus";

fn fmt_channel(
    f: &mut Formatter<'_>,
    name: &str,
    channel: &Arc<dyn ClaChannel>,
) -> std::fmt::Result {
    f.debug_struct(name)
        .field("channel_eid", &channel.channel_eid().as_str())
        .field("local_eid", &channel.local_eid().as_str())
        .finish()
}

#[derive(Clone)]
pub struct ChannelOpened {
    pub channel: Arc<dyn ClaChannel>,
}

#[derive(Clone)]
pub struct ChannelClosed {
    pub channel: Arc<dyn ClaChannel>,
}

#[derive(Clone)]
pub struct RegistrationActive {
    pub sink: String,
    pub callback: Arc<dyn ActiveRegistrationCallback>,
}

#[derive(Clone)]
pub struct LinkLocalEntryUp {
    pub channel: Arc<dyn ClaChannel>,
}

#[derive(Clone)]
pub struct LinkLocalEntryDown {
    pub channel: Arc<dyn ClaChannel>,
}

impl Debug for ChannelOpened {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_channel(f, "ChannelOpened", &self.channel)
    }
}

impl Debug for ChannelClosed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_channel(f, "ChannelClosed", &self.channel)
    }
}

impl Debug for LinkLocalEntryUp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_channel(f, "LinkLocalEntryUp", &self.channel)
    }
}

impl Debug for LinkLocalEntryDown {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_channel(f, "LinkLocalEntryDown", &self.channel)
    }
}

impl Debug for RegistrationActive {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationActive")
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// Channel lifecycle notifications fed by transports into the link-local table.
#[derive(Clone, Debug)]
pub enum ChannelEvent {
    Opened(ChannelOpened),
    Closed(ChannelClosed),
}

impl ChannelEvent {
    pub fn opened(channel: Arc<dyn ClaChannel>) -> Self {
        ChannelEvent::Opened(ChannelOpened { channel })
    }

    pub fn closed(channel: Arc<dyn ClaChannel>) -> Self {
        ChannelEvent::Closed(ChannelClosed { channel })
    }
}

#[derive(Clone, Debug)]
pub enum CoreEvent {
    ChannelOpened(ChannelOpened),
    ChannelClosed(ChannelClosed),
    RegistrationActive(RegistrationActive),
    LinkLocalEntryUp(LinkLocalEntryUp),
    LinkLocalEntryDown(LinkLocalEntryDown),
}

impl CoreEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CoreEvent::ChannelOpened(_) => "ChannelOpened",
            CoreEvent::ChannelClosed(_) => "ChannelClosed",
            CoreEvent::RegistrationActive(_) => "RegistrationActive",
            CoreEvent::LinkLocalEntryUp(_) => "LinkLocalEntryUp",
            CoreEvent::LinkLocalEntryDown(_) => "LinkLocalEntryDown",
        }
    }
}

impl From<ChannelEvent> for CoreEvent {
    fn from(event: ChannelEvent) -> Self {
        match event {
            ChannelEvent::Opened(opened) => CoreEvent::ChannelOpened(opened),
            ChannelEvent::Closed(closed) => CoreEvent::ChannelClosed(closed),
        }
    }
}

impl From<RegistrationActive> for CoreEvent {
    fn from(event: RegistrationActive) -> Self {
        CoreEvent::RegistrationActive(event)
    }
}

impl From<LinkLocalEntryUp> for CoreEvent {
    fn from(event: LinkLocalEntryUp) -> Self {
        CoreEvent::LinkLocalEntryUp(event)
    }
}

impl From<LinkLocalEntryDown> for CoreEvent {
    fn from(event: LinkLocalEntryDown) -> Self {
        CoreEvent::LinkLocalEntryDown(event)
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers the event reached.
    pub fn publish(&self, event: impl Into<CoreEvent>) -> usize {
        let event = event.into();
        let name = event.name();
        let delivered = self.sender.send(event).unwrap_or(0);
        trace!(
            event = events::EVENT_PUBLISHED,
            component = COMPONENT,
            core_event = name,
            delivered,
            "published core event"
        );
        delivered
    }

    /// Unsubscribing is dropping the receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Debug for EventBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
