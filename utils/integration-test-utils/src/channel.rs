//! Scripted CLA channel whose inbound stream is driven by the test.

use crate::eid;
use dtn_core::api::channel::{ChannelError, ClaChannel, InboundBundles};
use dtn_core::{Bundle, Eid};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type Feed = Result<Bundle, ChannelError>;

/// Channel whose inbound stream is driven by the test.
///
/// The first `recv_bundles` call gets the scripted stream; later calls get a stream
/// that never yields, as a reconnected transport that stays quiet.
pub struct ScriptedChannel {
    channel_eid: Eid,
    local_eid: Eid,
    sender: Mutex<Option<UnboundedSender<Feed>>>,
    feed: Mutex<Option<UnboundedReceiver<Feed>>>,
    streams_started: AtomicUsize,
}

impl ScriptedChannel {
    pub fn new(channel_eid: &str, local_eid: &str) -> Arc<Self> {
        let (sender, feed) = unbounded();
        Arc::new(Self {
            channel_eid: eid(channel_eid),
            local_eid: eid(local_eid),
            sender: Mutex::new(Some(sender)),
            feed: Mutex::new(Some(feed)),
            streams_started: AtomicUsize::new(0),
        })
    }

    pub fn as_channel(self: &Arc<Self>) -> Arc<dyn ClaChannel> {
        self.clone()
    }

    /// Returns `false` once the stream was ended or failed.
    pub fn push(&self, bundle: Bundle) -> bool {
        self.send(Ok(bundle))
    }

    /// Makes the stream yield an error; ingestion stops on it.
    pub fn fail(&self, reason: &str) -> bool {
        let fault = ChannelError::Fault {
            channel_eid: self.channel_eid.to_string(),
            reason: reason.to_string(),
        };
        let sent = self.send(Err(fault));
        self.end();
        sent
    }

    /// Ends the stream gracefully.
    pub fn end(&self) {
        self.sender.lock().expect("sender lock").take();
    }

    pub fn streams_started(&self) -> usize {
        self.streams_started.load(Ordering::SeqCst)
    }

    fn send(&self, item: Feed) -> bool {
        match self.sender.lock().expect("sender lock").as_ref() {
            Some(sender) => sender.unbounded_send(item).is_ok(),
            None => false,
        }
    }
}

impl ClaChannel for ScriptedChannel {
    fn channel_eid(&self) -> &Eid {
        &self.channel_eid
    }

    fn local_eid(&self) -> &Eid {
        &self.local_eid
    }

    fn recv_bundles(&self) -> InboundBundles {
        self.streams_started.fetch_add(1, Ordering::SeqCst);
        match self.feed.lock().expect("feed lock").take() {
            Some(feed) => feed.boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}
