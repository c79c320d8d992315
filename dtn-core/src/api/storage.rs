//! Bundle storage contract.

use crate::bundle::{Bundle, BundleId};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("bundle {0} not found in storage")]
    NotFound(BundleId),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BundleStorage: Send + Sync {
    async fn get(&self, bid: &BundleId) -> Result<Bundle, StorageError>;
}
