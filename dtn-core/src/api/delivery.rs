//! Application-agent delivery contract.

use crate::bundle::Bundle;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("delivery is disabled")]
    DeliveryDisabled,
    #[error("registration is passive")]
    PassiveRegistration,
    #[error("no registration matches the sink")]
    UnregisteredSink,
    #[error("application agent refused the bundle: {0}")]
    DeliveryRefused(String),
}

/// Push endpoint of an active registration.
///
/// Implemented by whatever owns the connection to the application agent. Returning
/// `Err(DeliveryError::DeliveryRefused(_))` reports that the agent rejected the bundle.
#[async_trait]
pub trait ActiveRegistrationCallback: Send + Sync {
    async fn recv(&self, bundle: &Bundle) -> Result<(), DeliveryError>;
}

/// How a registration accepts bundles.
#[derive(Clone)]
pub enum DeliveryMode {
    Active(Arc<dyn ActiveRegistrationCallback>),
    Passive,
}

impl DeliveryMode {
    pub fn is_active(&self) -> bool {
        matches!(self, DeliveryMode::Active(_))
    }

    /// Pushes a bundle through the callback; a passive mode always fails with
    /// [`DeliveryError::PassiveRegistration`].
    pub async fn push(&self, bundle: &Bundle) -> Result<(), DeliveryError> {
        match self {
            DeliveryMode::Active(callback) => callback.recv(bundle).await,
            DeliveryMode::Passive => Err(DeliveryError::PassiveRegistration),
        }
    }
}

impl Debug for DeliveryMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryMode::Active(_) => f.write_str("ACTIVE"),
            DeliveryMode::Passive => f.write_str("PASSIVE"),
        }
    }
}
