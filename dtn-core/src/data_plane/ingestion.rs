//! Inbound bundle ingestion for one open channel lifecycle.

use crate::api::channel::InboundBundles;
use crate::api::pipeline::BundleDispatch;
use crate::bundle::CLA_ORIGIN_TAG;
use crate::observability::{events, fields};
use crate::routing::channel_identity::ChannelIdentityKey;
use crate::routing::link_local_table::LinkLocalTable;
use futures::StreamExt;
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

const COMPONENT: &str = "channel_ingestion";

pub(crate) struct ChannelIngestion {
    key: ChannelIdentityKey,
    bundles: InboundBundles,
    lifecycle: u64,
    dispatch: Arc<dyn BundleDispatch>,
    table: Weak<LinkLocalTable>,
}

impl ChannelIngestion {
    pub(crate) fn new(
        key: ChannelIdentityKey,
        bundles: InboundBundles,
        lifecycle: u64,
        dispatch: Arc<dyn BundleDispatch>,
        table: Weak<LinkLocalTable>,
    ) -> Self {
        Self {
            key,
            bundles,
            lifecycle,
            dispatch,
            table,
        }
    }

    /// Forwards bundles in stream order until the stream ends or fails, then closes
    /// the lifecycle it was started for.
    pub(crate) async fn run(mut self) {
        let channel = self.key.channel().clone();
        let channel_eid = fields::format_eid(channel.channel_eid());
        let local_eid = channel.local_eid().as_str().to_string();

        while let Some(received) = self.bundles.next().await {
            match received {
                Ok(mut bundle) => {
                    bundle.tag(CLA_ORIGIN_TAG, local_eid.as_str());
                    debug!(
                        event = events::CHANNEL_BUNDLE_RECEIVED,
                        component = COMPONENT,
                        channel_eid = %channel_eid,
                        lifecycle = self.lifecycle,
                        bid = %fields::format_bundle_id(&bundle.bid),
                        src = %fields::format_source(&bundle),
                        dst = %fields::format_destination(&bundle),
                        "bundle received from channel"
                    );
                    self.dispatch.bundle_reception(bundle).await;
                }
                Err(err) => {
                    warn!(
                        event = events::CHANNEL_STREAM_FAILED,
                        component = COMPONENT,
                        channel_eid = %channel_eid,
                        lifecycle = self.lifecycle,
                        err = %err,
                        "inbound stream failed"
                    );
                    break;
                }
            }
        }

        debug!(
            event = events::CHANNEL_STREAM_ENDED,
            component = COMPONENT,
            channel_eid = %channel_eid,
            lifecycle = self.lifecycle,
            "inbound stream finished"
        );

        if let Some(table) = self.table.upgrade() {
            table.close_lifecycle(&self.key, self.lifecycle).await;
        }
    }
}
