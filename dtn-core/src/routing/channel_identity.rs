//! Pointer-identity key for channels.

use crate::api::channel::ClaChannel;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct ChannelIdentityKey {
    channel: Arc<dyn ClaChannel>,
}

impl ChannelIdentityKey {
    pub(crate) fn new(channel: Arc<dyn ClaChannel>) -> Self {
        Self { channel }
    }

    pub(crate) fn channel(&self) -> &Arc<dyn ClaChannel> {
        &self.channel
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.channel) as *const ()
    }
}

impl Hash for ChannelIdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

// Compares the data address only; vtable pointers of one object may differ across
// codegen units.
impl PartialEq for ChannelIdentityKey {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ChannelIdentityKey {}

impl Debug for ChannelIdentityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelIdentityKey")
            .field("channel_eid", &self.channel.channel_eid().as_str())
            .finish_non_exhaustive()
    }
}
