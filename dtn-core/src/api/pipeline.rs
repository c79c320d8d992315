//! Bundle-processing pipeline contract.

use crate::bundle::Bundle;
use async_trait::async_trait;

/// Entry points of the bundle-processing pipeline that the core calls into.
#[async_trait]
pub trait BundleDispatch: Send + Sync {
    /// Hands a locally originated bundle over for a routing decision.
    async fn dispatch(&self, bundle: Bundle);

    /// Hands over a bundle freshly received from a channel.
    async fn bundle_reception(&self, bundle: Bundle);

    async fn local_delivery_successful(&self, bundle: &Bundle);

    async fn local_delivery_failure(&self, sink: &str, bundle: &Bundle);
}
