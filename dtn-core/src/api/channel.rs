//! Convergence-layer adapter (CLA) channel contract.

use crate::bundle::Bundle;
use crate::eid::Eid;
use futures::stream::BoxStream;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChannelError {
    #[error("channel {channel_eid} failed: {reason}")]
    Fault { channel_eid: String, reason: String },
}

/// Inbound side of a channel. Ends when the connection closes or fails.
pub type InboundBundles = BoxStream<'static, Result<Bundle, ChannelError>>;

/// One connection to a neighbour, supplied by a transport.
///
/// Identity is the `Arc` allocation: two `Arc<dyn ClaChannel>` are the same channel
/// only if they point at the same object.
pub trait ClaChannel: Send + Sync {
    /// Identifier of the neighbour reachable through this channel.
    fn channel_eid(&self) -> &Eid;

    /// Link-local identifier this node exposes on the channel.
    fn local_eid(&self) -> &Eid;

    /// Starts the inbound bundle stream. Called once per open lifecycle.
    fn recv_bundles(&self) -> InboundBundles;
}
